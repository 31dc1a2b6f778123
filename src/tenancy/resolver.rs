use crate::config::TenancyConfig;
use crate::tenancy::tenant::TenantId;

/// Resolution inputs read from an inbound request. `claim` is the tenant
/// claim out of an already-validated bearer token; `header` is the raw
/// X-Tenant-Id header value; `host` is the Host header.
#[derive(Debug, Default)]
pub struct RequestSignals<'a> {
    pub claim: Option<&'a str>,
    pub header: Option<&'a str>,
    pub host: Option<&'a str>,
}

/// Map request signals to a tenant identifier.
///
/// Precedence is strict and security-ordered:
/// 1. Validated token claim - the only signal that cannot be forged.
/// 2. Explicit tenant header - untrusted, accepted only pre-authentication
///    (i.e. when no claim is present).
/// 3. Hostname: static host:port table for local development, otherwise the
///    literal hostname (port stripped) for multi-domain deployments.
///
/// Returns None when no signal yields a tenant; callers decide whether an
/// unscoped request is permitted for the operation at hand.
pub fn resolve(signals: &RequestSignals<'_>, config: &TenancyConfig) -> Option<TenantId> {
    if let Some(claim) = non_empty(signals.claim) {
        return Some(TenantId::new(claim));
    }

    if let Some(header) = non_empty(signals.header) {
        return Some(TenantId::new(header));
    }

    if let Some(host) = non_empty(signals.host) {
        if let Some(mapped) = config.host_map.get(host) {
            return Some(TenantId::new(mapped.clone()));
        }
        if config.use_host_fallback {
            let hostname = host.split(':').next().unwrap_or(host);
            if !hostname.is_empty() {
                return Some(TenantId::new(hostname));
            }
        }
    }

    None
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TenancyConfig {
        TenancyConfig::default()
    }

    #[test]
    fn claim_wins_over_header_and_host() {
        let signals = RequestSignals {
            claim: Some("t1"),
            header: Some("t2"),
            host: Some("localhost:5114"),
        };
        assert_eq!(resolve(&signals, &config()), Some(TenantId::new("t1")));
    }

    #[test]
    fn header_wins_over_host_when_no_claim() {
        let signals = RequestSignals {
            claim: None,
            header: Some("t2"),
            host: Some("localhost:5114"),
        };
        assert_eq!(resolve(&signals, &config()), Some(TenantId::new("t2")));
    }

    #[test]
    fn known_dev_hosts_map_to_tenants() {
        let cases = [
            ("localhost:5114", "rajeev-pvt"),
            ("localhost:7001", "green-pantry"),
            ("localhost:7002", "bangaru-kottu"),
        ];
        for (host, expected) in cases {
            let signals = RequestSignals {
                host: Some(host),
                ..Default::default()
            };
            assert_eq!(resolve(&signals, &config()), Some(TenantId::new(expected)));
        }
    }

    #[test]
    fn unknown_host_falls_back_to_literal_hostname() {
        let signals = RequestSignals {
            host: Some("shop.example.com"),
            ..Default::default()
        };
        assert_eq!(
            resolve(&signals, &config()),
            Some(TenantId::new("shop.example.com"))
        );
    }

    #[test]
    fn unknown_host_with_port_strips_port() {
        let signals = RequestSignals {
            host: Some("shop.example.com:8443"),
            ..Default::default()
        };
        assert_eq!(
            resolve(&signals, &config()),
            Some(TenantId::new("shop.example.com"))
        );
    }

    #[test]
    fn no_signals_resolves_to_none() {
        assert_eq!(resolve(&RequestSignals::default(), &config()), None);
    }

    #[test]
    fn blank_header_is_ignored() {
        let signals = RequestSignals {
            header: Some("   "),
            host: Some("localhost:7001"),
            ..Default::default()
        };
        assert_eq!(
            resolve(&signals, &config()),
            Some(TenantId::new("green-pantry"))
        );
    }

    #[test]
    fn host_fallback_can_be_disabled() {
        let mut config = config();
        config.use_host_fallback = false;
        let signals = RequestSignals {
            host: Some("shop.example.com"),
            ..Default::default()
        };
        assert_eq!(resolve(&signals, &config), None);
    }
}
