use crossbeam_channel::{Receiver, TryRecvError};
use std::io::{BufRead, BufReader};
use std::time::{Duration, Instant};

/// 4x4 키패드의 키
///
/// ```text
/// 1 2 3 A
/// 4 5 6 B
/// 7 8 9 C
/// * 0 # D
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Digit(char),
    /// 한 글자 지우기
    A,
    /// 등록된 전체 버스 도착 정보 조회
    B,
    /// 입력한 번호 등록
    C,
    /// 음성 입력 모드
    D,
    /// 입력 초기화
    Star,
    /// 접두어 `M` 입력
    Hash,
}

impl Key {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            d @ '0'..='9' => Some(Key::Digit(d)),
            'A' => Some(Key::A),
            'B' => Some(Key::B),
            'C' => Some(Key::C),
            'D' => Some(Key::D),
            '*' => Some(Key::Star),
            '#' => Some(Key::Hash),
            _ => None,
        }
    }

    pub fn label(&self) -> char {
        match self {
            Key::Digit(d) => *d,
            Key::A => 'A',
            Key::B => 'B',
            Key::C => 'C',
            Key::D => 'D',
            Key::Star => '*',
            Key::Hash => '#',
        }
    }

    /// 키를 누를 때 들려줄 확인음
    pub fn echo(&self) -> Option<String> {
        match self {
            Key::Digit(d) => Some(d.to_string()),
            Key::A => Some("지우기".to_string()),
            Key::Star => Some("다시".to_string()),
            Key::Hash => Some("엠".to_string()),
            Key::D => Some("음성 입력 모드로 전환합니다.".to_string()),
            Key::B | Key::C => None,
        }
    }
}

/// 키 입력원 (폴링 방식, 대기하지 않음)
pub trait KeySource: Send {
    fn poll(&mut self) -> Option<Key>;

    /// 접점 떨림이 있는 입력원이면 true (키오스크가 채터링 방지를 적용)
    fn needs_debounce(&self) -> bool {
        true
    }
}

/// 채터링 방지
///
/// 직전에 받아들인 키와 다르거나, 같은 키라도 지연 시간이 지났으면 받아들인다.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    last: Option<(Key, Instant)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    pub fn accept(&mut self, key: Key, now: Instant) -> bool {
        let accepted = match self.last {
            Some((last_key, at)) => key != last_key || now.duration_since(at) > self.delay,
            None => true,
        };
        if accepted {
            self.last = Some((key, now));
        }
        accepted
    }
}

/// 키 입력이 만들어 내는 동작
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    /// 입력 버퍼만 바뀜
    Edited,
    /// 입력한 번호 등록 요청 (버퍼는 비워짐)
    Register(String),
    /// 입력 없이 등록을 누름
    EmptyInput,
    /// 전체 도착 정보 조회
    LookupAll,
    /// 음성 입력 모드
    VoiceMode,
}

/// 키패드 입력 버퍼
#[derive(Debug, Default)]
pub struct InputBuffer {
    text: String,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// 키 하나를 반영
    ///
    /// # Examples
    ///
    /// ```
    /// # use bus_kiosk::keypad::{InputBuffer, Key, KeyCommand};
    /// let mut input = InputBuffer::new();
    /// input.press(Key::Hash);
    /// for c in "5107".chars() {
    ///     input.press(Key::Digit(c));
    /// }
    /// assert_eq!(input.press(Key::C), KeyCommand::Register("M5107".to_string()));
    /// assert_eq!(input.as_str(), "");
    /// ```
    pub fn press(&mut self, key: Key) -> KeyCommand {
        match key {
            Key::Digit(d) => {
                self.text.push(d);
                KeyCommand::Edited
            }
            Key::Hash => {
                self.text.push('M');
                KeyCommand::Edited
            }
            Key::A => {
                self.text.pop();
                KeyCommand::Edited
            }
            Key::Star => {
                self.text.clear();
                KeyCommand::Edited
            }
            Key::B => KeyCommand::LookupAll,
            Key::C => {
                if self.text.is_empty() {
                    KeyCommand::EmptyInput
                } else {
                    KeyCommand::Register(std::mem::take(&mut self.text))
                }
            }
            Key::D => KeyCommand::VoiceMode,
        }
    }
}

/// 콘솔 키패드
///
/// 표준 입력을 줄 단위로 읽는 스레드가 각 문자를 키로 바꿔 채널로 넘긴다.
/// 예: `5100C` + Enter → 5, 1, 0, 0, C
///
/// 같은 글자가 연달아 와도 모두 입력이므로 채터링 방지를 거치지 않는다.
pub struct ConsoleKeypad {
    rx: Receiver<Key>,
}

impl ConsoleKeypad {
    pub fn spawn() -> Self {
        Self::from_reader(BufReader::new(std::io::stdin()))
    }

    /// 임의의 줄 단위 입력에서 키를 읽는다
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                for key in line.chars().filter_map(Key::from_char) {
                    if tx.send(key).is_err() {
                        return;
                    }
                }
            }
            log::debug!("콘솔 키패드 입력 종료");
        });
        Self { rx }
    }
}

impl KeySource for ConsoleKeypad {
    fn poll(&mut self) -> Option<Key> {
        match self.rx.try_recv() {
            Ok(key) => Some(key),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn needs_debounce(&self) -> bool {
        false
    }
}
