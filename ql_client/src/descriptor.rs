/// HTTP method of an outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Authentication required by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthLevel {
    /// No credentials attached
    Public,
    /// API key header only
    ApiKey,
    /// API key header plus request signature
    Signed,
}

/// Immutable descriptor of one outbound request
///
/// `family` is the discriminative endpoint: the path prefix naming the
/// shared quota pool this call draws from. Dimension ids and the
/// header-to-limit map are both scoped by it.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub base_url: String,
    pub family: String,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub auth: AuthLevel,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, base_url: impl Into<String>, family: impl Into<String>, path: impl Into<String>) -> Self {
        Self { method, base_url: base_url.into(), family: family.into(), path: path.into(), params: Vec::new(), auth: AuthLevel::Public }
    }

    pub fn get(base_url: impl Into<String>, family: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, base_url, family, path)
    }

    pub fn post(base_url: impl Into<String>, family: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, base_url, family, path)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn with_auth(mut self, auth: AuthLevel) -> Self {
        self.auth = auth;
        self
    }

    /// Full request URL without the query string
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let descriptor = RequestDescriptor::get("https://api.binance.com", "/api", "/api/v3/depth");
        assert_eq!(descriptor.url(), "https://api.binance.com/api/v3/depth");
        assert_eq!(descriptor.family, "/api");
    }

    #[test]
    fn test_params_accumulate() {
        let descriptor = RequestDescriptor::get("https://api.binance.com", "/api", "/api/v3/depth")
            .with_param("symbol", "BTCUSDT")
            .with_param("limit", "100");

        assert_eq!(descriptor.params.len(), 2);
        assert_eq!(descriptor.params[0], ("symbol".to_string(), "BTCUSDT".to_string()));
    }

    #[test]
    fn test_auth_defaults_to_public() {
        let descriptor = RequestDescriptor::post("https://api.binance.com", "/api", "/api/v3/order");
        assert_eq!(descriptor.auth, AuthLevel::Public);

        let signed = descriptor.with_auth(AuthLevel::Signed);
        assert_eq!(signed.auth, AuthLevel::Signed);
    }
}
