//! Tests for record filtering.

use super::*;

fn record(interface: &str, address: &str, is_up: bool, is_loopback: bool) -> AddressRecord {
    AddressRecord::new(interface, address.parse().unwrap(), 24, is_up, is_loopback)
}

fn sample() -> Vec<AddressRecord> {
    vec![
        record("lo", "127.0.0.1", true, true),
        record("lo", "::1", true, true),
        record("eth0", "192.168.1.5", true, false),
        record("eth0", "fe80::1", true, false),
        record("eth1", "10.0.0.2", false, false),
        record("eth1", "fd00::2", false, false),
    ]
}

mod enumeration_filter {
    use super::*;

    #[test]
    fn default_keeps_only_ipv4_up_non_loopback() {
        let filter = EnumerationFilter::default();
        let kept: Vec<_> = sample().into_iter().filter(|r| filter.matches(r)).collect();

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].interface(), "eth0");
        assert_eq!(kept[0].address().to_string(), "192.168.1.5");
    }

    #[test]
    fn every_combination_respects_each_flag() {
        for bits in 0..8u8 {
            let filter = EnumerationFilter::new(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);

            for r in sample().iter().filter(|r| filter.matches(r)) {
                if !filter.include_ipv6 {
                    assert_eq!(r.family(), AddressFamily::V4, "{filter:?} kept {r:?}");
                }
                if !filter.include_loopback {
                    assert!(!r.is_loopback(), "{filter:?} kept {r:?}");
                }
                if !filter.include_down {
                    assert!(r.is_up(), "{filter:?} kept {r:?}");
                }
            }
        }
    }

    #[test]
    fn everything_keeps_all_records() {
        let kept = sample()
            .iter()
            .filter(|r| EnumerationFilter::EVERYTHING.matches(r))
            .count();
        assert_eq!(kept, sample().len());
    }

    #[test]
    fn all_families_keeps_ipv6_of_up_interfaces() {
        let kept: Vec<_> = sample()
            .into_iter()
            .filter(|r| EnumerationFilter::ALL_FAMILIES.matches(r))
            .collect();

        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| r.interface() == "eth0"));
    }
}

mod name_regex_filter {
    use super::*;

    #[test]
    fn matches_pattern() {
        let filter = NameRegexFilter::new("^eth").unwrap();

        assert!(filter.matches_name("eth0"));
        assert!(!filter.matches_name("wlan0"));
        assert_eq!(filter.pattern(), "^eth");
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(NameRegexFilter::new("[unclosed").is_err());
    }

    #[test]
    fn matches_record_interface() {
        let filter = NameRegexFilter::new("^lo$").unwrap();

        assert!(filter.matches(&record("lo", "127.0.0.1", true, true)));
        assert!(!filter.matches(&record("eth0", "10.0.0.1", true, false)));
    }
}

mod filter_chain {
    use super::*;

    #[test]
    fn empty_chain_matches_everything() {
        let chain = FilterChain::new();

        assert!(chain.is_empty());
        assert!(sample().iter().all(|r| chain.matches(r)));
    }

    #[test]
    fn exclude_wins_over_include() {
        let chain = FilterChain::new()
            .include(NameRegexFilter::new("^eth").unwrap())
            .exclude(NameRegexFilter::new("^eth1$").unwrap());

        assert!(chain.matches_name("eth0"));
        assert!(!chain.matches_name("eth1"));
        assert!(!chain.matches_name("lo"));
    }

    #[test]
    fn includes_use_or_semantics() {
        let chain = FilterChain::new()
            .include(NameRegexFilter::new("^eth").unwrap())
            .include(NameRegexFilter::new("^wlan").unwrap());

        assert!(chain.matches_name("eth0"));
        assert!(chain.matches_name("wlan0"));
        assert!(!chain.matches_name("docker0"));
        assert_eq!(chain.include_count(), 2);
        assert_eq!(chain.exclude_count(), 0);
    }

    #[test]
    fn base_filter_applies_before_names() {
        let chain = FilterChain::new()
            .with_base(EnumerationFilter::default())
            .include(NameRegexFilter::new("^eth").unwrap());

        let kept: Vec<_> = sample().into_iter().filter(|r| chain.matches(r)).collect();

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].address().to_string(), "192.168.1.5");
    }

    #[test]
    fn debug_shows_counts() {
        let chain = FilterChain::new().exclude(NameRegexFilter::new("^lo").unwrap());
        let debug = format!("{chain:?}");

        assert!(debug.contains("FilterChain"));
        assert!(debug.contains("exclude_count: 1"));
    }
}
