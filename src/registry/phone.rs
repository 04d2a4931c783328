use super::error::{RegistryError, RegistryResult};

const COUNTRY_CODE: &str = "54";
const MOBILE_PREFIX: char = '9';
/// `54` + `9` + ten-digit area code and number
const WHATSAPP_PHONE_LEN: usize = 13;

/// Normalize an Argentine phone number into the `549XXXXXXXXXX` form
/// WhatsApp expects.
///
/// Strips everything but digits, then an existing country code, leading
/// zeros and the legacy `15` mobile prefix, and finally forces the mobile `9`.
/// Anything that does not end up with exactly 13 digits is rejected.
pub fn to_whatsapp_phone(input: &str) -> RegistryResult<String> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();

    let mut s = digits.as_str();
    if let Some(rest) = s.strip_prefix(COUNTRY_CODE) {
        s = rest;
    }
    s = s.trim_start_matches('0');
    if let Some(rest) = s.strip_prefix("15") {
        s = rest;
    }

    let mut result = String::with_capacity(WHATSAPP_PHONE_LEN);
    result.push_str(COUNTRY_CODE);
    if !s.starts_with(MOBILE_PREFIX) {
        result.push(MOBILE_PREFIX);
    }
    result.push_str(s);

    if result.len() != WHATSAPP_PHONE_LEN {
        return Err(RegistryError::InvalidPhone(input.to_string()));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_number_gets_country_and_mobile_prefix() {
        assert_eq!(to_whatsapp_phone("11 2233-4455").unwrap(), "5491122334455");
    }

    #[test]
    fn test_existing_prefixes_are_not_duplicated() {
        assert_eq!(to_whatsapp_phone("+54 9 11 2233 4455").unwrap(), "5491122334455");
        assert_eq!(to_whatsapp_phone("011 2233 4455").unwrap(), "5491122334455");
        assert_eq!(to_whatsapp_phone("15 1122334455").unwrap(), "5491122334455");
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        for input in ["", "abc", "123", "11 2233 44556677", "+54"] {
            let err = to_whatsapp_phone(input).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidPhone(_)), "{input}");
        }
    }

    #[test]
    fn test_success_always_has_fixed_length() {
        for input in ["3512345678", "0351 234-5678", "+549 351 2345678", "9 351 2345678"] {
            let phone = to_whatsapp_phone(input).unwrap();
            assert_eq!(phone.len(), 13, "{input}");
            assert!(phone.starts_with("549"));
        }
    }
}
