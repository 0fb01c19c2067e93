use crate::grammar::{self, BusId};
use crate::syllables;

/// 번호 앞뒤에 붙는 군말 ("번", "버스")
const FILLER_WORDS: [&str; 2] = ["번", "버스"];

/// 정정/두 부분 발화 구분자
const SEGMENT_SEPARATOR: &str = "다시";

/// 음성 인식 결과에서 버스 노선 번호 추출
///
/// 1. 공백 제거, "번"/"버스" 제거, 대문자화
/// 2. 문자열 전체가 노선 번호 형식이면 그대로 사용
/// 3. 아니면 "다시"로 나눈 조각을 각각 한글 디코딩. 첫 조각을 쓰되,
///    첫 두 조각이 모두 숫자이면 `첫-둘`로 합친다 ("오일공공 다시 일" → "5100-1")
/// 4. 결과는 숫자를 포함하고 노선 번호 문법을 통과해야 한다
///
/// 찾지 못하면 None (재질문 대상이지 오류가 아님)
///
/// # Examples
///
/// ```
/// # use bus_kiosk::normalizer::extract_identifier;
/// assert_eq!(extract_identifier("엠오일공칠 번").unwrap().as_str(), "M5107");
/// assert_eq!(extract_identifier("오일공공 다시 일").unwrap().as_str(), "5100-1");
/// assert!(extract_identifier("안녕하세요").is_none());
/// ```
pub fn extract_identifier(raw_transcript: &str) -> Option<BusId> {
    let text = canonicalize(raw_transcript);
    if text.is_empty() {
        return None;
    }

    let candidate = match grammar::match_identifier(&text) {
        Some(strict) => strict,
        None => decode_segments(&text)?,
    };

    if !candidate.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    BusId::parse(&candidate)
}

/// 공백과 군말을 지우고 대문자로 바꾼다
pub fn canonicalize(raw_transcript: &str) -> String {
    let mut text: String = raw_transcript
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    for filler in FILLER_WORDS {
        text = text.replace(filler, "");
    }
    text.to_uppercase()
}

/// "다시" 구분 조각 디코딩 (정식 형식이 아닐 때의 경로)
///
/// 세 번째 이후 조각은 쓰이지 않는다.
fn decode_segments(text: &str) -> Option<String> {
    let mut decoded = text
        .split(SEGMENT_SEPARATOR)
        .filter(|piece| !piece.is_empty())
        .map(decode_segment)
        .filter(|segment| !segment.is_empty());

    let first = decoded.next()?;
    match decoded.next() {
        Some(second) if is_numeric(&first) && is_numeric(&second) => {
            Some(format!("{}-{}", first, second))
        }
        _ => Some(first),
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// 한 조각을 왼쪽부터 훑으며 한글 음절을 숫자/영문자로 바꾼다
///
/// 위치마다 한 번만 결정한다:
/// - 대응표([`syllables::match_table`])에서 가장 긴 일치 토큰 → 해당 문자
/// - ASCII 영문자/숫자 → 대문자로 그대로
/// - 그 밖의 문자 → 버림
///
/// 실패하지 않으며 빈 문자열을 돌려줄 수 있다.
pub fn decode_segment(segment: &str) -> String {
    let mut out = String::new();
    let mut rest = segment;

    while let Some(c) = rest.chars().next() {
        if let Some(token) = syllables::longest_prefix_token(rest) {
            out.push(token.output);
            rest = &rest[token.syllables.len()..];
            continue;
        }
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
        }
        rest = &rest[c.len_utf8()..];
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::is_valid_identifier;

    fn extract(s: &str) -> String {
        extract_identifier(s)
            .map(BusId::into_string)
            .unwrap_or_default()
    }

    #[test]
    fn test_strict_format() {
        assert_eq!(extract("5100"), "5100");
        assert_eq!(extract("M5107"), "M5107");
        assert_eq!(extract("m5107"), "M5107");
        assert_eq!(extract("7000-1"), "7000-1");
    }

    #[test]
    fn test_filler_words_and_whitespace() {
        assert_eq!(extract("5100번"), "5100");
        assert_eq!(extract("5100 번 버스"), "5100");
        assert_eq!(extract("버스 M 5107"), "M5107");
        assert_eq!(extract(" 7000 - 1 "), "7000-1");
    }

    #[test]
    fn test_korean_digits() {
        assert_eq!(extract("오일공공"), "5100");
        assert_eq!(extract("칠공공공"), "7000");
        assert_eq!(extract("일일일이"), "1112");
        assert_eq!(extract("영구"), "09");
    }

    #[test]
    fn test_korean_letter_prefix() {
        assert_eq!(extract("엠오일공칠"), "M5107");
        assert_eq!(extract("엠 오일공칠 번"), "M5107");
        assert_eq!(extract("지팔팔"), "G88");
    }

    #[test]
    fn test_mixed_syllables_and_ascii() {
        assert_eq!(extract("M오일공칠"), "M5107");
        assert_eq!(extract("51공공"), "5100");
    }

    #[test]
    fn test_suffix_join() {
        assert_eq!(extract("오일공공 다시 일"), "5100-1");
        assert_eq!(extract("칠공공공다시1"), "7000-1");
    }

    #[test]
    fn test_first_segment_wins_without_numeric_pair() {
        // 첫 조각에 영문자가 있으면 접미어로 합치지 않는다
        assert_eq!(extract("엠오일공칠 다시 일"), "M5107");
        // 두 번째 조각이 영문자로 시작하면 합치지 않는다
        assert_eq!(extract("오일공공 다시 엠"), "5100");
    }

    #[test]
    fn test_third_segment_is_dropped() {
        assert_eq!(extract("오일공공 다시 일 다시 이"), "5100-1");
    }

    #[test]
    fn test_empty_pieces_are_skipped() {
        assert_eq!(extract("다시 오일공공"), "5100");
        assert_eq!(extract("안녕 다시 오일공공"), "5100");
    }

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(extract(""), "");
        assert_eq!(extract("   "), "");
        assert_eq!(extract("번 버스"), "");
    }

    #[test]
    fn test_no_digits() {
        assert_eq!(extract("안녕하세요"), "");
        assert_eq!(extract("엠"), "");
        assert_eq!(extract("ABC"), "");
    }

    #[test]
    fn test_too_long_is_rejected() {
        assert_eq!(extract("123456"), "");
        assert_eq!(extract("일이삼사오육"), "");
        assert_eq!(extract("M12345-12"), "");
    }

    #[test]
    fn test_results_always_satisfy_grammar() {
        let samples = [
            "5100",
            "오일공공",
            "엠오일공칠",
            "오일공공 다시 일",
            "에이치 일이",
            "구구구구구 다시 구구",
            "브이삼",
            "아무 말 오 칠",
        ];
        for sample in samples {
            if let Some(id) = extract_identifier(sample) {
                assert!(is_valid_identifier(id.as_str()), "{} → {}", sample, id);
            }
        }
    }

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("엠오일공칠"), "M5107");
        assert_eq!(decode_segment("에이치일"), "H1");
        assert_eq!(decode_segment("더블유이"), "W2");
        assert_eq!(decode_segment("x9"), "X9");
        assert_eq!(decode_segment("안녕"), "");
        assert_eq!(decode_segment(""), "");
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize(" m 5107 번 버스 "), "M5107");
        assert_eq!(canonicalize("\t\n"), "");
    }
}
