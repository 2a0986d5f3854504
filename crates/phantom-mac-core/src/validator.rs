//! Address assignability checks
//!
//! A candidate is assignable when it parses as six hex pairs (each separator
//! independently `:` or `-`) and its first octet is even. No OUI registry
//! lookup is performed.

use crate::address::MacAddress;
use crate::error::{Error, Result};

/// Check whether `candidate` may be assigned to an interface
pub fn is_assignable(candidate: &str) -> bool {
    validate(candidate).is_ok()
}

/// Parse `candidate` and enforce the unicast rule
///
/// # Returns
///
/// - `Ok(MacAddress)`: The parsed address
/// - `Err(Error::InvalidAddress)`: Malformed or multicast-style address
pub fn validate(candidate: &str) -> Result<MacAddress> {
    let mac: MacAddress = candidate.parse()?;
    if !mac.is_unicast() {
        return Err(Error::invalid_address(candidate));
    }
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_cases() {
        assert!(is_assignable("00:11:22:33:44:55"));
        assert!(!is_assignable("01:11:22:33:44:55"));
        assert!(!is_assignable("00:11:22:33:44"));
        assert!(!is_assignable("GG:11:22:33:44:55"));
    }

    #[test]
    fn test_every_separator_combination() {
        // 2^5 separator layouts, each checked against an even and an odd first octet
        for mask in 0u32..32 {
            let mut text = String::from("XX");
            for (i, group) in ["1a", "2B", "3c", "4D", "5e"].iter().enumerate() {
                text.push(if mask & (1 << i) == 0 { ':' } else { '-' });
                text.push_str(group);
            }

            for first in 0u8..=255 {
                let candidate = text.replacen("XX", &format!("{:02X}", first), 1);
                assert_eq!(
                    is_assignable(&candidate),
                    first % 2 == 0,
                    "candidate {}",
                    candidate
                );
            }
        }
    }

    #[test]
    fn test_validate_reports_input_verbatim() {
        match validate("03-00-00-00-00-00") {
            Err(Error::InvalidAddress { address }) => assert_eq!(address, "03-00-00-00-00-00"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(
            validate("0a-0B-0c-0D-0e-0F").unwrap().to_string(),
            "0a:0b:0c:0d:0e:0f"
        );
    }
}
