//! 한글 음절 → 숫자/영문자 변환 표
//!
//! 음성 인식 결과에서 "오일공공", "엠오일공칠"처럼 한글로 읽힌 번호를 되돌리기 위한
//! 정적 대응표. 디코더는 [`match_table`]의 순서대로 현재 위치에 맞는 토큰을 찾는다.

use std::sync::OnceLock;

/// 한글 숫자 음절
pub const DIGIT_SYLLABLES: &[(&str, char)] = &[
    ("공", '0'),
    ("영", '0'),
    ("일", '1'),
    ("이", '2'),
    ("삼", '3'),
    ("사", '4'),
    ("오", '5'),
    ("육", '6'),
    ("칠", '7'),
    ("팔", '8'),
    ("구", '9'),
];

/// 영문자 이름의 한글 표기
pub const LETTER_NAMES: &[(&str, char)] = &[
    ("에이", 'A'),
    ("비", 'B'),
    ("씨", 'C'),
    ("디", 'D'),
    ("이", 'E'),
    ("에프", 'F'),
    ("지", 'G'),
    ("에이치", 'H'),
    ("아이", 'I'),
    ("제이", 'J'),
    ("케이", 'K'),
    ("엘", 'L'),
    ("엠", 'M'),
    ("엔", 'N'),
    ("오", 'O'),
    ("피", 'P'),
    ("큐", 'Q'),
    ("알", 'R'),
    ("에스", 'S'),
    ("티", 'T'),
    ("유", 'U'),
    ("브이", 'V'),
    ("더블유", 'W'),
    ("엑스", 'X'),
    ("와이", 'Y'),
    ("제트", 'Z'),
];

/// 토큰 종류
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Letter,
    Digit,
}

/// 디코더 대응표의 한 항목
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub syllables: &'static str,
    pub output: char,
    pub kind: TokenKind,
}

impl Token {
    fn len_chars(&self) -> usize {
        self.syllables.chars().count()
    }
}

/// 위치별 매칭 순서가 정해진 대응표
///
/// 정렬 기준:
/// 1. 음절 수가 긴 토큰 먼저 ("에이치" → "에이" → "이")
/// 2. 같은 길이라면 숫자 음절이 영문자 이름보다 먼저
///
/// 2번 때문에 한 음절짜리 "이"/"오"는 E/O가 아니라 2/5로 읽힌다.
pub fn match_table() -> &'static [Token] {
    static TABLE: OnceLock<Vec<Token>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let letters = LETTER_NAMES.iter().map(|&(syllables, output)| Token {
            syllables,
            output,
            kind: TokenKind::Letter,
        });
        let digits = DIGIT_SYLLABLES.iter().map(|&(syllables, output)| Token {
            syllables,
            output,
            kind: TokenKind::Digit,
        });
        let mut table: Vec<Token> = letters.chain(digits).collect();
        table.sort_by(|a, b| {
            b.len_chars()
                .cmp(&a.len_chars())
                .then_with(|| kind_rank(a.kind).cmp(&kind_rank(b.kind)))
        });
        table
    })
}

fn kind_rank(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Digit => 0,
        TokenKind::Letter => 1,
    }
}

/// 문자열 앞부분에 맞는 첫 번째 토큰
pub fn longest_prefix_token(input: &str) -> Option<&'static Token> {
    match_table().iter().find(|token| input.starts_with(token.syllables))
}
