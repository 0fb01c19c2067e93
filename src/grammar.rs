use regex_lite::Regex;
use std::fmt;
use std::sync::OnceLock;

/// 버스 노선 번호의 최대 길이 (문자 수)
pub const MAX_IDENTIFIER_LEN: usize = 8;

/// 표준 노선 번호 패턴
///
/// 선택적 영문 대문자 1자 + 숫자 1~5자리 + 선택적 `-` 숫자 1~2자리
const IDENTIFIER_PATTERN: &str = r"^([A-Z])?(\d{1,5})(?:-(\d{1,2}))?$";

fn identifier_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(IDENTIFIER_PATTERN).expect("정적 패턴은 항상 유효"))
}

/// 노선 번호 문법 검사
///
/// 대소문자 구분 없이 입력을 대문자로 바꾼 뒤 전체 일치와 길이 제한을 확인한다.
/// 노선 번호를 만들어내는 모든 경로(키패드, 음성 인식)가 이 함수 하나로 검증한다.
///
/// # Examples
///
/// ```
/// # use bus_kiosk::grammar::is_valid_identifier;
/// assert!(is_valid_identifier("5100"));
/// assert!(is_valid_identifier("m5107"));
/// assert!(is_valid_identifier("7000-1"));
/// assert!(!is_valid_identifier("MM12"));
/// ```
pub fn is_valid_identifier(s: &str) -> bool {
    let upper = s.to_uppercase();
    upper.chars().count() <= MAX_IDENTIFIER_LEN && identifier_regex().is_match(&upper)
}

/// 문자열 전체가 노선 번호 패턴과 일치하면 접두어+숫자+(-접미어)로 재조립한다
///
/// 부분 일치는 거부한다. 길이 제한은 여기서 확인하지 않는다.
pub fn match_identifier(s: &str) -> Option<String> {
    let caps = identifier_regex().captures(s)?;
    let mut assembled = String::with_capacity(s.len());
    if let Some(prefix) = caps.get(1) {
        assembled.push_str(prefix.as_str());
    }
    assembled.push_str(caps.get(2)?.as_str());
    if let Some(suffix) = caps.get(3) {
        assembled.push('-');
        assembled.push_str(suffix.as_str());
    }
    Some(assembled)
}

/// 검증된 버스 노선 번호
///
/// 생성 시점에 [`is_valid_identifier`]를 통과한 대문자 표준형만 담는다.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusId(String);

impl BusId {
    /// 문자열을 표준형 노선 번호로 변환 (문법에 맞지 않으면 None)
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        if is_valid_identifier(&upper) {
            Some(Self(upper))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BusId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("5100"));
        assert!(is_valid_identifier("1"));
        assert!(is_valid_identifier("M5107"));
        assert!(is_valid_identifier("7000-1"));
        assert!(is_valid_identifier("G1234-56"));
    }

    #[test]
    fn test_lowercase_input_is_accepted() {
        assert!(is_valid_identifier("m5107"));
        assert_eq!(BusId::parse("m5107").unwrap().as_str(), "M5107");
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("M"));
        assert!(!is_valid_identifier("MM12"));
        assert!(!is_valid_identifier("123456"));
        assert!(!is_valid_identifier("5100-"));
        assert!(!is_valid_identifier("5100-123"));
        assert!(!is_valid_identifier("5100M"));
        assert!(!is_valid_identifier("51 00"));
    }

    #[test]
    fn test_length_limit() {
        // 패턴에는 맞지만 9자라서 거부
        assert!(!is_valid_identifier("M12345-12"));
        assert!(is_valid_identifier("12345-12"));
        assert!(is_valid_identifier("M1234-12"));
    }

    #[test]
    fn test_match_identifier_reassembles_parts() {
        assert_eq!(match_identifier("M5107").as_deref(), Some("M5107"));
        assert_eq!(match_identifier("7000-1").as_deref(), Some("7000-1"));
        assert_eq!(match_identifier("X5100Y"), None);
        assert_eq!(match_identifier("오일공공"), None);
    }

    #[test]
    fn test_bus_id_display() {
        let id = BusId::parse(" 7000-1 ").unwrap();
        assert_eq!(id.to_string(), "7000-1");
        assert_eq!(id.into_string(), "7000-1");
    }
}
