use log::warn;

/// Source encoding for a non-working day
pub const HOLIDAY_CODE: &str = "2";
/// Source encoding for a working day
pub const WORKDAY_CODE: &str = "0";

const HOLIDAY_WORDS: [&str; 4] = ["true", "是", "放假", "holiday"];
const WORKDAY_WORDS: [&str; 4] = ["false", "否", "上班", "work"];

/// Interpret a holiday flag cell, `None` if it is not recognised
pub fn parse_holiday_flag(raw: &str) -> Option<bool> {
    let value = raw.trim();
    match value {
        HOLIDAY_CODE => return Some(true),
        WORKDAY_CODE => return Some(false),
        _ => {}
    }

    let lowered = value.to_lowercase();
    if HOLIDAY_WORDS.contains(&lowered.as_str()) {
        Some(true)
    } else if WORKDAY_WORDS.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Interpret a holiday flag cell. Anything unrecognised counts as a working
/// day.
pub fn convert_holiday_flag(raw: &str) -> bool {
    parse_holiday_flag(raw).unwrap_or_else(|| {
        warn!("Unknown holiday flag '{}', treating as a working day", raw);
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("2", true ; "holiday code")]
    #[test_case("0", false ; "workday code")]
    #[test_case(" 2 ", true ; "padded code")]
    #[test_case("TRUE", true ; "english true")]
    #[test_case("Holiday", true ; "english holiday")]
    #[test_case("放假", true ; "chinese holiday")]
    #[test_case("是", true ; "chinese yes")]
    #[test_case("False", false ; "english false")]
    #[test_case("work", false ; "english work")]
    #[test_case("上班", false ; "chinese workday")]
    #[test_case("否", false ; "chinese no")]
    fn test_known_flags(raw: &str, expected: bool) {
        assert_eq!(parse_holiday_flag(raw), Some(expected));
        assert_eq!(convert_holiday_flag(raw), expected);
    }

    #[test_case("garbage" ; "garbage")]
    #[test_case("1" ; "unused code")]
    #[test_case("" ; "empty")]
    #[test_case("2.0" ; "float code")]
    fn test_unknown_flags_default_to_workday(raw: &str) {
        assert_eq!(parse_holiday_flag(raw), None);
        assert!(!convert_holiday_flag(raw));
    }
}
