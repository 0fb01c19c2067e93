use crate::grammar::BusId;
use crate::normalizer;
use crate::tts::Announcer;
use crate::types::Playback;
use async_trait::async_trait;
use std::time::Duration;

/// 긍정 응답 토큰
const AFFIRMATIVE_TOKENS: [&str; 8] = ["네", "예", "응", "맞아", "오케이", "확인", "어", "그래"];

/// 부정 응답 토큰
const NEGATIVE_TOKENS: [&str; 5] = ["아니", "아니요", "틀려", "다시", "취소"];

/// 한 번 듣기의 결과
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Listen {
    /// 인식된 문장
    Heard(String),
    /// 녹음은 됐지만 알아듣지 못함
    NotUnderstood,
    /// 녹음 자체가 실패
    RecordingFailed,
}

impl Listen {
    pub fn transcript(&self) -> Option<&str> {
        match self {
            Listen::Heard(text) => Some(text),
            _ => None,
        }
    }
}

/// 음성을 듣고 문장으로 돌려주는 외부 협력자
///
/// 프로세스 안 호출인지 별도 프로세스인지는 대화 로직이 알 필요 없다.
#[async_trait]
pub trait TranscriptSource: Send {
    async fn listen(&mut self, duration: Duration) -> Listen;
}

/// 예/아니오 응답 분류
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    Affirmative,
    Negative,
    Indeterminate,
}

/// 응답 문장을 분류한다
///
/// 긍정 토큰이 하나라도 포함되면 긍정 (부정 토큰보다 우선),
/// 그다음 부정 토큰, 둘 다 없거나 문장이 없으면 판단 불가.
///
/// # Examples
///
/// ```
/// # use bus_kiosk::dialog::{classify_answer, Answer};
/// assert_eq!(classify_answer(Some("네 맞아요")), Answer::Affirmative);
/// assert_eq!(classify_answer(Some("취소할게요")), Answer::Negative);
/// assert_eq!(classify_answer(None), Answer::Indeterminate);
/// ```
pub fn classify_answer(transcript: Option<&str>) -> Answer {
    let Some(text) = transcript else {
        return Answer::Indeterminate;
    };
    if AFFIRMATIVE_TOKENS.iter().any(|token| text.contains(token)) {
        Answer::Affirmative
    } else if NEGATIVE_TOKENS.iter().any(|token| text.contains(token)) {
        Answer::Negative
    } else {
        Answer::Indeterminate
    }
}

/// 대화 상태
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogState {
    AwaitingCandidate,
    AwaitingConfirmation { candidate: BusId },
    Committed(BusId),
}

/// 사용자에게 들려줄 안내
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    AskNumber,
    RecordingFailed,
    NotUnderstood,
    NoNumberFound,
    Confirm(BusId),
    AskYesNo,
    Confirmed(BusId),
    Rejected,
    Unclear,
    GaveUp,
}

impl Prompt {
    pub fn message(&self) -> String {
        match self {
            Prompt::AskNumber => "버스 번호를 말씀해주세요.".to_string(),
            Prompt::RecordingFailed => "음성 녹음에 실패했습니다. 다시 시도합니다.".to_string(),
            Prompt::NotUnderstood => {
                "죄송합니다, 음성을 알아듣지 못했습니다. 다시 말씀해주세요.".to_string()
            }
            Prompt::NoNumberFound => "버스 번호를 찾지 못했습니다. 다시 말씀해주세요.".to_string(),
            Prompt::Confirm(bus) => format!("{}번 버스, 맞으신가요?", bus),
            Prompt::AskYesNo => "네 또는 아니오로 답해주세요.".to_string(),
            Prompt::Confirmed(bus) => format!("{}번 버스로 확인되었습니다.", bus),
            Prompt::Rejected => "알겠습니다. 버스 번호를 다시 말씀해주세요.".to_string(),
            Prompt::Unclear => {
                "죄송합니다. 답변을 제대로 듣지 못했습니다. 다시 말씀해주세요.".to_string()
            }
            Prompt::GaveUp => "오류가 발생하여 버스 번호를 확인하지 못했습니다.".to_string(),
        }
    }
}

/// 듣기 시간 설정
#[derive(Clone, Copy, Debug)]
pub struct DialogTiming {
    /// 번호 발화 녹음 시간
    pub candidate: Duration,
    /// 예/아니오 녹음 시간
    pub confirmation: Duration,
    /// 녹음 실패 후 재시도 전 대기
    pub retry_delay: Duration,
    /// "네 또는 아니오로 답해주세요." 재생 방식
    pub yes_no_playback: Playback,
}

/// 번호 제안 → 예/아니오 확인의 2단계 대화
///
/// 상태 전이:
/// `AwaitingCandidate → AwaitingConfirmation → {Committed | AwaitingCandidate}`
///
/// 예/아니오를 알아듣지 못하면 같은 질문을 반복하지 않고 번호부터 다시 묻는다.
#[derive(Debug)]
pub struct ConfirmationDialog {
    state: DialogState,
}

impl ConfirmationDialog {
    pub fn new() -> Self {
        Self {
            state: DialogState::AwaitingCandidate,
        }
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    /// 번호 발화 처리 (`AwaitingCandidate`에서만 유효)
    pub fn propose(&mut self, listened: &Listen) -> Prompt {
        if !matches!(self.state, DialogState::AwaitingCandidate) {
            log::warn!("번호 대기 상태가 아닌데 번호 발화가 들어왔습니다: {:?}", self.state);
            return Prompt::AskNumber;
        }

        let text = match listened {
            Listen::RecordingFailed => return Prompt::RecordingFailed,
            Listen::NotUnderstood => return Prompt::NotUnderstood,
            Listen::Heard(text) => text,
        };

        log::info!("전체 음성 인식 결과 ▶ \"{}\"", text);
        match normalizer::extract_identifier(text) {
            Some(candidate) => {
                log::info!("버스 번호 추출 ▶ {}", candidate);
                self.state = DialogState::AwaitingConfirmation {
                    candidate: candidate.clone(),
                };
                Prompt::Confirm(candidate)
            }
            None => {
                log::info!("버스 번호를 추출하지 못했습니다: \"{}\"", text);
                Prompt::NoNumberFound
            }
        }
    }

    /// 예/아니오 발화 처리 (`AwaitingConfirmation`에서만 유효)
    pub fn answer(&mut self, listened: &Listen) -> Prompt {
        let candidate = match std::mem::replace(&mut self.state, DialogState::AwaitingCandidate) {
            DialogState::AwaitingConfirmation { candidate } => candidate,
            other => {
                log::warn!("확인 대기 상태가 아닌데 응답이 들어왔습니다: {:?}", other);
                self.state = other;
                return Prompt::AskNumber;
            }
        };

        if let Some(text) = listened.transcript() {
            log::info!("확인 응답 인식 결과 ▶ \"{}\"", text);
        }
        match classify_answer(listened.transcript()) {
            Answer::Affirmative => {
                self.state = DialogState::Committed(candidate.clone());
                Prompt::Confirmed(candidate)
            }
            Answer::Negative => Prompt::Rejected,
            Answer::Indeterminate => Prompt::Unclear,
        }
    }

    /// 확정된 번호
    pub fn committed(&self) -> Option<&BusId> {
        match &self.state {
            DialogState::Committed(bus) => Some(bus),
            _ => None,
        }
    }

    /// 번호가 확정될 때까지 대화를 진행한다
    ///
    /// `max_attempts`번 번호를 물어도 확정되지 않으면 포기하고 None.
    /// 0이면 무제한.
    pub async fn run(
        &mut self,
        source: &mut dyn TranscriptSource,
        announcer: &dyn Announcer,
        timing: &DialogTiming,
        max_attempts: u32,
    ) -> Option<BusId> {
        say(announcer, Prompt::AskNumber, Playback::Blocking).await;

        let mut attempts = 0;
        while self.committed().is_none() {
            if max_attempts > 0 && attempts >= max_attempts {
                say(announcer, Prompt::GaveUp, Playback::Blocking).await;
                return None;
            }
            attempts += 1;
            self.state = DialogState::AwaitingCandidate;

            let heard = source.listen(timing.candidate).await;
            let prompt = self.propose(&heard);
            let proposed = matches!(prompt, Prompt::Confirm(_));
            let retry_delay = matches!(prompt, Prompt::RecordingFailed);
            say(announcer, prompt, Playback::Blocking).await;
            if retry_delay {
                tokio::time::sleep(timing.retry_delay).await;
            }
            if !proposed {
                continue;
            }

            say(announcer, Prompt::AskYesNo, timing.yes_no_playback).await;
            let reply = source.listen(timing.confirmation).await;
            let prompt = self.answer(&reply);
            say(announcer, prompt, Playback::Blocking).await;
        }

        self.committed().cloned()
    }
}

impl Default for ConfirmationDialog {
    fn default() -> Self {
        Self::new()
    }
}

async fn say(announcer: &dyn Announcer, prompt: Prompt, playback: Playback) {
    let message = prompt.message();
    log::info!("[음성 안내] {}", message);
    announcer.announce(&message, playback).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingAnnouncer, ScriptedSource};

    fn timing() -> DialogTiming {
        DialogTiming {
            candidate: Duration::from_secs(3),
            confirmation: Duration::from_secs(3),
            retry_delay: Duration::ZERO,
            yes_no_playback: Playback::Background,
        }
    }

    fn heard(s: &str) -> Listen {
        Listen::Heard(s.to_string())
    }

    #[test]
    fn test_classify_answer() {
        assert_eq!(classify_answer(Some("네")), Answer::Affirmative);
        assert_eq!(classify_answer(Some("그래 맞아")), Answer::Affirmative);
        assert_eq!(classify_answer(Some("오케이")), Answer::Affirmative);
        assert_eq!(classify_answer(Some("틀려")), Answer::Negative);
        assert_eq!(classify_answer(Some("다시 할게")), Answer::Negative);
        assert_eq!(classify_answer(Some("음")), Answer::Indeterminate);
        assert_eq!(classify_answer(Some("")), Answer::Indeterminate);
        assert_eq!(classify_answer(None), Answer::Indeterminate);
    }

    #[test]
    fn test_affirmative_takes_precedence() {
        // "아니요"는 "예"를 포함하지 않지만 "아니요 네"처럼 둘 다 있으면 긍정
        assert_eq!(classify_answer(Some("아니요 네")), Answer::Affirmative);
        // "어"는 "아니어"에도 들어 있다
        assert_eq!(classify_answer(Some("아니어")), Answer::Affirmative);
    }

    #[test]
    fn test_state_transitions_commit() {
        let mut dialog = ConfirmationDialog::new();
        assert_eq!(dialog.state(), &DialogState::AwaitingCandidate);

        let prompt = dialog.propose(&heard("오일공공 번"));
        let candidate = BusId::parse("5100").unwrap();
        assert_eq!(prompt, Prompt::Confirm(candidate.clone()));
        assert_eq!(
            dialog.state(),
            &DialogState::AwaitingConfirmation {
                candidate: candidate.clone()
            }
        );

        assert_eq!(dialog.answer(&heard("네")), Prompt::Confirmed(candidate.clone()));
        assert_eq!(dialog.committed(), Some(&candidate));
    }

    #[test]
    fn test_empty_candidate_stays_awaiting() {
        let mut dialog = ConfirmationDialog::new();
        assert_eq!(dialog.propose(&heard("안녕하세요")), Prompt::NoNumberFound);
        assert_eq!(dialog.propose(&Listen::NotUnderstood), Prompt::NotUnderstood);
        assert_eq!(dialog.propose(&Listen::RecordingFailed), Prompt::RecordingFailed);
        assert_eq!(dialog.state(), &DialogState::AwaitingCandidate);
    }

    #[test]
    fn test_negative_and_unclear_return_to_candidate() {
        let mut dialog = ConfirmationDialog::new();
        dialog.propose(&heard("5100"));
        assert_eq!(dialog.answer(&heard("아니")), Prompt::Rejected);
        assert_eq!(dialog.state(), &DialogState::AwaitingCandidate);

        dialog.propose(&heard("5100"));
        assert_eq!(dialog.answer(&heard("음...")), Prompt::Unclear);
        assert_eq!(dialog.state(), &DialogState::AwaitingCandidate);

        dialog.propose(&heard("5100"));
        assert_eq!(dialog.answer(&Listen::RecordingFailed), Prompt::Unclear);
        assert_eq!(dialog.state(), &DialogState::AwaitingCandidate);
        assert!(dialog.committed().is_none());
    }

    #[test]
    fn test_answer_without_candidate_is_ignored() {
        let mut dialog = ConfirmationDialog::new();
        assert_eq!(dialog.answer(&heard("네")), Prompt::AskNumber);
        assert_eq!(dialog.state(), &DialogState::AwaitingCandidate);
    }

    #[tokio::test]
    async fn test_run_commits_after_retries() {
        let mut source = ScriptedSource::new(vec![
            Listen::RecordingFailed,
            heard("어..."),
            heard("엠오일공칠"),
            heard("아니"),
            heard("칠공공공 다시 일"),
            heard("네 맞아요"),
        ]);
        let announcer = RecordingAnnouncer::default();
        let mut dialog = ConfirmationDialog::new();

        let result = dialog.run(&mut source, &announcer, &timing(), 0).await;
        assert_eq!(result, BusId::parse("7000-1"));

        let spoken = announcer.messages();
        assert_eq!(spoken[0], "버스 번호를 말씀해주세요.");
        assert!(spoken.contains(&"음성 녹음에 실패했습니다. 다시 시도합니다.".to_string()));
        assert!(spoken.contains(&"버스 번호를 찾지 못했습니다. 다시 말씀해주세요.".to_string()));
        assert!(spoken.contains(&"M5107번 버스, 맞으신가요?".to_string()));
        assert!(spoken.contains(&"알겠습니다. 버스 번호를 다시 말씀해주세요.".to_string()));
        assert_eq!(spoken.last().unwrap(), "7000-1번 버스로 확인되었습니다.");
    }

    #[tokio::test]
    async fn test_run_gives_up_after_max_attempts() {
        let mut source = ScriptedSource::new(vec![
            Listen::NotUnderstood,
            heard("5100"),
            heard("글쎄"),
        ]);
        let announcer = RecordingAnnouncer::default();
        let mut dialog = ConfirmationDialog::new();

        let result = dialog.run(&mut source, &announcer, &timing(), 2).await;
        assert!(result.is_none());
        assert_eq!(
            announcer.messages().last().unwrap(),
            "오류가 발생하여 버스 번호를 확인하지 못했습니다."
        );
    }
}
