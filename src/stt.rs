use crate::config::SttConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// 음성 인식 외부 협력자
///
/// 네트워크/서비스 오류는 None으로 바뀌어 돌아온다.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// 16비트 리틀엔디언 모노 PCM을 문장으로 변환
    async fn recognize(&self, audio: &[u8]) -> Option<String>;
}

/// Google Cloud Speech-to-Text REST API 응답
#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

impl RecognizeResponse {
    /// 첫 번째 결과의 첫 번째 후보
    fn first_transcript(self) -> Option<String> {
        let transcript = self
            .results
            .into_iter()
            .next()?
            .alternatives
            .into_iter()
            .next()?
            .transcript;
        if transcript.trim().is_empty() {
            None
        } else {
            Some(transcript)
        }
    }
}

/// Google Cloud Speech-to-Text 백엔드
pub struct GoogleSpeech {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    language_code: String,
    sample_rate: u32,
}

impl GoogleSpeech {
    /// 인증 파일에서 API 키를 읽어 클라이언트를 만든다
    ///
    /// # Errors
    ///
    /// 인증 파일이 없거나 비어 있으면 오류 (시작 불가 조건).
    pub fn new(config: &SttConfig, sample_rate: u32) -> Result<Self> {
        let api_key = fs::read_to_string(&config.credentials_path)
            .with_context(|| {
                format!("인증 키 파일({})을 찾을 수 없습니다", config.credentials_path)
            })?
            .trim()
            .to_string();
        if api_key.is_empty() {
            anyhow::bail!("인증 키 파일({})이 비어 있습니다", config.credentials_path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("STT HTTP 클라이언트 생성 실패")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            language_code: config.language_code.clone(),
            sample_rate,
        })
    }

    fn request_body(&self, audio: &[u8]) -> serde_json::Value {
        serde_json::json!({
            "config": {
                "encoding": "LINEAR16",
                "sampleRateHertz": self.sample_rate,
                "languageCode": self.language_code,
            },
            "audio": {
                "content": BASE64.encode(audio),
            },
        })
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<Option<String>> {
        log::info!("STT 서버로 음성 변환 요청 중... ({} 바이트)", audio.len());
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(audio))
            .send()
            .await
            .context("STT API 요청 실패")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("STT API 오류: {} - {}", status, error_text);
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .context("STT API 응답 해석 실패")?;
        Ok(parsed.first_transcript())
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleSpeech {
    async fn recognize(&self, audio: &[u8]) -> Option<String> {
        if audio.is_empty() {
            return None;
        }
        match self.transcribe(audio).await {
            Ok(transcript) => transcript,
            Err(e) => {
                log::error!("STT API 오류: {:#}", e);
                None
            }
        }
    }
}
