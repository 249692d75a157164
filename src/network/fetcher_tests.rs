//! Tests for the enumerator and fetch errors.

use super::*;
use std::cell::RefCell;

/// A mock fetcher returning a predefined table, or an error.
struct MockFetcher {
    result: RefCell<Option<Result<Vec<AddressRecord>, FetchError>>>,
}

impl MockFetcher {
    fn returning(records: Vec<AddressRecord>) -> Self {
        Self {
            result: RefCell::new(Some(Ok(records))),
        }
    }

    fn failing(error: FetchError) -> Self {
        Self {
            result: RefCell::new(Some(Err(error))),
        }
    }
}

impl AddressFetcher for MockFetcher {
    fn fetch(&self) -> Result<Vec<AddressRecord>, FetchError> {
        self.result.borrow_mut().take().unwrap_or_else(|| Ok(vec![]))
    }
}

fn host() -> Vec<AddressRecord> {
    vec![
        AddressRecord::new("lo", "127.0.0.1".parse().unwrap(), 8, true, true),
        AddressRecord::new("lo", "::1".parse().unwrap(), 128, true, true),
        AddressRecord::new("eth0", "192.168.1.5".parse().unwrap(), 24, true, false),
        AddressRecord::new("eth0", "fe80::5".parse().unwrap(), 64, true, false),
        AddressRecord::new("eth2", "10.9.9.9".parse().unwrap(), 16, false, false),
    ]
}

mod enumerate {
    use super::*;

    #[test]
    fn loopback_and_ethernet_host_yields_single_record() {
        let enumerator = Enumerator::new(MockFetcher::returning(vec![
            AddressRecord::new("lo", "127.0.0.1".parse().unwrap(), 8, true, true),
            AddressRecord::new("eth0", "192.168.1.5".parse().unwrap(), 24, true, false),
        ]));

        let list = enumerator.enumerate(false, false, false);

        assert_eq!(list.len(), 1);
        let r = &list.records()[0];
        assert_eq!(r.interface(), "eth0");
        assert_eq!(r.address().to_string(), "192.168.1.5");
        assert_eq!(r.family(), AddressFamily::V4);
        assert_eq!(r.prefix_length(), 24);
        assert!(r.is_up());
        assert!(!r.is_loopback());
    }

    #[test]
    fn preserves_fetch_order() {
        let enumerator = Enumerator::new(MockFetcher::returning(host()));
        let list = enumerator.enumerate(true, true, true);

        let names: Vec<_> = list.iter().map(|r| r.address().to_string()).collect();
        assert_eq!(
            names,
            ["127.0.0.1", "::1", "192.168.1.5", "fe80::5", "10.9.9.9"]
        );
    }

    #[test]
    fn fetch_failure_yields_empty_list_with_error() {
        let enumerator = Enumerator::new(MockFetcher::failing(FetchError::Platform {
            message: "table unavailable".to_string(),
        }));

        let list = enumerator.enumerate(true, true, true);

        assert!(list.is_error());
        assert_ne!(list.error_code(), 0);
        assert!(list.records().is_empty());
        assert!(list.error().unwrap().to_string().contains("table unavailable"));
    }

    #[test]
    fn enumerate_with_applies_custom_filter() {
        use crate::network::filter::NameRegexFilter;

        let enumerator = Enumerator::new(MockFetcher::returning(host()));
        let list = enumerator.enumerate_with(&NameRegexFilter::new("^lo$").unwrap());

        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|r| r.interface() == "lo"));
    }
}

mod presets {
    use super::*;

    #[test]
    fn ipv4_addresses_excludes_ipv6_loopback_and_down() {
        let list = Enumerator::new(MockFetcher::returning(host())).ipv4_addresses();

        assert_eq!(list.len(), 1);
        assert_eq!(list.records()[0].address().to_string(), "192.168.1.5");
    }

    #[test]
    fn ipv6_addresses_keeps_only_ipv6() {
        let list = Enumerator::new(MockFetcher::returning(host())).ipv6_addresses();

        assert_eq!(list.len(), 1);
        assert_eq!(list.records()[0].address().to_string(), "fe80::5");
    }

    #[test]
    fn all_addresses_keeps_both_families_of_up_interfaces() {
        let list = Enumerator::new(MockFetcher::returning(host())).all_addresses();

        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|r| r.interface() == "eth0"));
    }

    #[test]
    fn ipv6_preset_keeps_error() {
        let list = Enumerator::new(MockFetcher::failing(FetchError::Unsupported)).ipv6_addresses();

        assert_eq!(list.error_code(), UNSUPPORTED_CODE);
        assert!(list.is_empty());
    }
}

mod fetch_error {
    use super::*;

    #[test]
    fn codes_are_non_zero() {
        let errors = [
            FetchError::Platform {
                message: "x".to_string(),
            },
            FetchError::Unsupported,
            FetchError::Io {
                context: "getifaddrs",
                source: std::io::Error::other("boom"),
            },
        ];

        for e in &errors {
            assert_ne!(e.code(), 0, "{e}");
        }
    }

    #[test]
    fn io_error_uses_os_code() {
        let error = FetchError::Io {
            context: "getifaddrs",
            source: std::io::Error::from_raw_os_error(12),
        };

        assert_eq!(error.code(), 12);
        assert!(error.to_string().starts_with("getifaddrs:"));
    }

    #[test]
    fn unsupported_displays_message() {
        assert!(FetchError::Unsupported.to_string().contains("not supported"));
    }
}

// Integration test: enumerates the real host table.
#[cfg(unix)]
#[test]
fn platform_enumeration_reports_loopback() {
    let list = enumerate(true, true, true);

    assert!(!list.is_error(), "enumeration failed: {:?}", list.error());
    assert!(
        list.iter().any(AddressRecord::is_loopback),
        "expected a loopback record, got {list:?}"
    );
}
