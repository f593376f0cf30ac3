mod common;

use std::sync::Arc;

use common::{cert_entry, fingerprint, StubFetcher, CUSTOMER, HOST, PKI, SIGNER, TRUST_SERVER};
use trustpin_engine as tp;
use tp::{ComposePolicy, TrustDirective, TrustError, TrustManager, TrustPolicy, ValidationType};

fn compose(t: ValidationType, host: &str) -> ComposePolicy {
    let mut c = ComposePolicy::new(t, host);
    c.certificate_source = Arc::new(PKI.source());
    c
}

#[test]
fn engine_defaults_values() {
    use tp::EngineDefaults as D;
    assert!(D::VALIDATE_HOST_NAME);
    assert!(!D::PIN_ONLY);
    assert!(!D::ALLOW_INSECURE_HTTP);
    assert_eq!(D::MANIFEST_MAX_SKEW_SECS, 600);
    assert_eq!(D::FETCH_TIMEOUT, std::time::Duration::from_secs(30));
}

#[test]
fn registry_lookup_and_removal() {
    let mut manager = TrustManager::new();
    assert!(manager.is_empty());
    manager.add(Arc::new(TrustDirective::disabled("a.example.com")));
    manager.add(Arc::new(TrustDirective::standard(HOST, PKI.settings())));

    let mut hosts = manager.all_host_names();
    hosts.sort();
    assert_eq!(hosts, vec!["a.example.com".to_string(), HOST.to_string()]);
    assert_eq!(manager.all_policies().len(), 2);
    assert_eq!(manager.policy(HOST).unwrap().host_name(), HOST);
    assert!(manager.policy("unknown.example.com").is_none());

    assert!(manager.remove("a.example.com").is_some());
    assert!(manager.remove("a.example.com").is_none());
    assert_eq!(manager.len(), 1);
}

#[test]
fn last_policy_for_a_host_wins() {
    let manager = TrustManager::with_policies([
        Arc::new(TrustDirective::standard(HOST, PKI.settings())) as Arc<dyn TrustPolicy>,
        Arc::new(TrustDirective::disabled(HOST)) as Arc<dyn TrustPolicy>,
    ]);
    assert_eq!(manager.len(), 1);
    assert!(manager.policy(HOST).unwrap().validate(&PKI.self_signed_chain()));
}

#[test]
fn unregistered_hosts_are_not_trusted() {
    let manager = TrustManager::new();
    assert!(!tp::validate_host(&manager, HOST, &PKI.chain()));
}

#[test]
fn compose_builds_every_offline_type() {
    let mut manager = TrustManager::new();
    for (t, host) in [
        (ValidationType::Disabled, "disabled.example.com"),
        (ValidationType::Standard, HOST),
        (ValidationType::Custom, "custom.example.com"),
        (ValidationType::PinCertificate, "cert.example.com"),
        (ValidationType::PinPublicKey, "key.example.com"),
    ] {
        tp::register_policy(&mut manager, &compose(t, host)).expect("offline policy");
    }
    assert_eq!(manager.len(), 5);
    assert!(tp::validate_host(&manager, "disabled.example.com", &PKI.expired_chain()));
    assert!(tp::validate_host(&manager, HOST, &PKI.chain()));
    assert!(!tp::validate_host(&manager, "custom.example.com", &PKI.chain()));
    // No bundled pins: nothing matches.
    assert!(!tp::validate_host(&manager, "cert.example.com", &PKI.chain()));
}

#[test]
fn compose_host_name_check_toggle() {
    let mut c = compose(ValidationType::Standard, "elsewhere.example.net");
    assert!(!c.create().unwrap().validate(&PKI.chain()));
    c.validate_host_name = false;
    assert!(c.create().unwrap().validate(&PKI.chain()));
}

#[test]
fn compose_disabled_ignores_other_settings() {
    let mut c = ComposePolicy::new(ValidationType::Disabled, HOST);
    c.pin_only = true;
    c.custom_validation = Some(Arc::new(|_: &tp::CertificateChain| false));
    assert!(c.create().unwrap().validate(&PKI.self_signed_chain()));
}

#[test]
fn compose_online_policy() {
    let dir = tempfile::tempdir().unwrap();
    let stub = StubFetcher::serving(SIGNER.fresh(cert_entry(HOST, &[fingerprint(&PKI.intermediate)])));

    let mut c = compose(ValidationType::PinCertificateOnline, HOST);
    c.trust_server = Some(TRUST_SERVER.to_string());
    c.trust_server_certificate = Some(SIGNER.cert_der.clone());
    c.customer = Some(CUSTOMER.to_string());
    c.cache_dir = Some(dir.path().to_path_buf());
    c.fetcher = Some(stub.clone());

    let directive = c.create_directive().unwrap();
    assert_eq!(directive.validation_type(), ValidationType::PinCertificateOnline);
    assert!(directive.online_store().unwrap().cache_path().starts_with(dir.path()));
    assert!(directive.validate(&PKI.chain()));
    assert_eq!(stub.calls(), 1);
}

#[test]
fn compose_online_policy_needs_customer() {
    let mut c = compose(ValidationType::PinPublicKeyOnline, HOST);
    c.trust_server = Some(TRUST_SERVER.to_string());
    c.trust_server_certificate = Some(SIGNER.cert_der.clone());
    match c.create() {
        Err(TrustError::Config(message)) => assert!(message.contains("customer")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("online policy without customer was built"),
    }
}
