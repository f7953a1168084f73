//! Regras de confiança
//!
//! Quem chama pelo ingress do Home Assistant (header injetado pelo proxy) ou
//! pela rede interna do supervisor é confiável; os demais precisam do token
//! bearer. Cada regra é uma estratégia testável sem HTTP.

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName};

use crate::config::AuthSettings;
use crate::utils::logging::*;

/// Dados imutáveis da requisição usados nas decisões de autorização
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub headers: HeaderMap,
    pub remote_addr: Option<IpAddr>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, remote_addr: Option<IpAddr>) -> Self {
        Self { headers, remote_addr }
    }

    /// Token de `Authorization: Bearer <token>`, se houver
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }
}

pub trait TrustPolicy: Send + Sync {
    fn is_trusted(&self, ctx: &RequestContext) -> bool;

    fn describe(&self) -> String;
}

/// Confia em requisições que trazem o header do proxy de ingress
#[derive(Debug, Clone)]
pub struct ProxyHeaderTrust {
    header: HeaderName,
}

impl ProxyHeaderTrust {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl TrustPolicy for ProxyHeaderTrust {
    fn is_trusted(&self, ctx: &RequestContext) -> bool {
        ctx.headers.contains_key(&self.header)
    }

    fn describe(&self) -> String {
        format!("header {}", self.header)
    }
}

/// Confia em endereços de origem com um dos prefixos configurados
#[derive(Debug, Clone)]
pub struct AddressPrefixTrust {
    prefixes: Vec<String>,
}

impl AddressPrefixTrust {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }
}

impl TrustPolicy for AddressPrefixTrust {
    fn is_trusted(&self, ctx: &RequestContext) -> bool {
        let Some(addr) = ctx.remote_addr else {
            return false;
        };
        // IPv4 mapeado em IPv6 (::ffff:172.30.32.2) compara como IPv4
        let addr = match addr {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(addr),
            v4 => v4,
        };
        let text = addr.to_string();
        self.prefixes.iter().any(|prefix| !prefix.is_empty() && text.starts_with(prefix.as_str()))
    }

    fn describe(&self) -> String {
        format!("address prefixes {:?}", self.prefixes)
    }
}

/// Confiável se qualquer uma das regras aceitar
pub struct TrustAny {
    policies: Vec<Box<dyn TrustPolicy>>,
}

impl TrustAny {
    pub fn new(policies: Vec<Box<dyn TrustPolicy>>) -> Self {
        Self { policies }
    }
}

impl TrustPolicy for TrustAny {
    fn is_trusted(&self, ctx: &RequestContext) -> bool {
        self.policies.iter().any(|policy| policy.is_trusted(ctx))
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.policies.iter().map(|p| p.describe()).collect();
        format!("any of [{}]", parts.join(", "))
    }
}

/// Ninguém é confiável: só o token bearer autoriza
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustNobody;

impl TrustPolicy for TrustNobody {
    fn is_trusted(&self, _ctx: &RequestContext) -> bool {
        false
    }

    fn describe(&self) -> String {
        "nobody".to_string()
    }
}

/// Política padrão do add-on: header do ingress OU rede interna
pub fn policy_from_settings(settings: &AuthSettings) -> Box<dyn TrustPolicy> {
    let mut policies: Vec<Box<dyn TrustPolicy>> = Vec::new();

    match HeaderName::try_from(settings.proxy_header.as_str()) {
        Ok(name) => policies.push(Box::new(ProxyHeaderTrust::new(name))),
        Err(e) => log_warning(&format!(
            "⚠️ Invalid proxy header '{}' ignored: {}",
            settings.proxy_header, e
        )),
    }

    if !settings.trusted_networks.is_empty() {
        policies.push(Box::new(AddressPrefixTrust::new(settings.trusted_networks.clone())));
    }

    if policies.is_empty() {
        return Box::new(TrustNobody);
    }
    Box::new(TrustAny::new(policies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn ctx_with_header(name: &'static str, value: &'static str) -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        RequestContext::new(headers, None)
    }

    fn ctx_from(addr: IpAddr) -> RequestContext {
        RequestContext::new(HeaderMap::new(), Some(addr))
    }

    #[test]
    fn test_proxy_header_presence_is_trusted() {
        let policy = ProxyHeaderTrust::new(HeaderName::from_static("x-ingress-path"));

        assert!(policy.is_trusted(&ctx_with_header("x-ingress-path", "/api/hassio_ingress/abc")));
        assert!(!policy.is_trusted(&RequestContext::default()));
    }

    #[test]
    fn test_address_prefix() {
        let policy = AddressPrefixTrust::new(vec!["172.30.32.".to_string(), "127.0.0.1".to_string()]);

        assert!(policy.is_trusted(&ctx_from(IpAddr::V4(Ipv4Addr::new(172, 30, 32, 2)))));
        assert!(policy.is_trusted(&ctx_from(IpAddr::V4(Ipv4Addr::LOCALHOST))));
        assert!(!policy.is_trusted(&ctx_from(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)))));
        assert!(!policy.is_trusted(&RequestContext::default()));
    }

    #[test]
    fn test_ipv4_mapped_address_uses_ipv4_text() {
        let policy = AddressPrefixTrust::new(vec!["172.30.32.".to_string()]);
        let mapped = Ipv4Addr::new(172, 30, 32, 1).to_ipv6_mapped();

        assert!(policy.is_trusted(&ctx_from(IpAddr::V6(mapped))));
        assert!(!policy.is_trusted(&ctx_from(IpAddr::V6(Ipv6Addr::LOCALHOST))));
    }

    #[test]
    fn test_empty_prefix_never_matches() {
        let policy = AddressPrefixTrust::new(vec![String::new()]);
        assert!(!policy.is_trusted(&ctx_from(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)))));
    }

    #[test]
    fn test_trust_any_and_nobody() {
        let any = TrustAny::new(vec![
            Box::new(TrustNobody),
            Box::new(ProxyHeaderTrust::new(HeaderName::from_static("x-ingress-path"))),
        ]);

        assert!(any.is_trusted(&ctx_with_header("x-ingress-path", "/")));
        assert!(!any.is_trusted(&RequestContext::default()));
        assert!(!TrustNobody.is_trusted(&ctx_with_header("x-ingress-path", "/")));
    }

    #[test]
    fn test_policy_from_default_settings() {
        let settings = crate::config::Settings::defaults().unwrap();
        let policy = policy_from_settings(&settings.auth);

        assert!(policy.is_trusted(&ctx_with_header("x-ingress-path", "/")));
        assert!(policy.is_trusted(&ctx_from(IpAddr::V4(Ipv4Addr::new(172, 30, 32, 2)))));
        assert!(!policy.is_trusted(&ctx_from(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)))));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(ctx_with_header("authorization", "Bearer abc123").bearer_token(), Some("abc123"));
        assert_eq!(ctx_with_header("authorization", "bearer abc123").bearer_token(), Some("abc123"));
        assert_eq!(ctx_with_header("authorization", "Basic abc123").bearer_token(), None);
        assert_eq!(ctx_with_header("authorization", "Bearer ").bearer_token(), None);
        assert_eq!(RequestContext::default().bearer_token(), None);
    }
}
