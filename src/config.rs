use crate::types::Playback;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub keypad: KeypadConfig,
    #[serde(default)]
    pub indicator: IndicatorConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 등록 목록 저장 설정
///
/// # 기본값
///
/// - `list_path`: "bus_number.txt"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_list_path")]
    pub list_path: String,
}

/// 마이크로컨트롤러 시리얼 설정
///
/// # 기본값
///
/// - `device`: "/dev/ttyACM0"
/// - `baud_rate`: 115200
/// - `settle_ms`: 2000 (포트를 열면 보드가 재시작하므로 대기)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    #[serde(default = "default_serial_device")]
    pub device: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// 키패드 설정
///
/// # 기본값
///
/// - `debounce_ms`: 300
/// - `poll_interval_ms`: 20 (메인 루프 주기)
/// - `echo_keys`: true (누른 키를 읽어 줌)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeypadConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_true")]
    pub echo_keys: bool,
}

/// 표시등 설정
///
/// `led_value_path`가 없으면 로그로만 표시한다.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IndicatorConfig {
    pub led_value_path: Option<String>,
}

/// 음성 안내(TTS) 설정
///
/// 합성 명령의 `{text}`는 안내 문장, `{output}`은 임시 음성 파일 경로로 치환된다.
///
/// # 기본값
///
/// - `enabled`: true
/// - `speaker_keyword`: "USB"
/// - `synth_command`: `espeak-ng -v ko -w {output} {text}`
/// - `player_command`: `aplay -q`
/// - `device_flag`: "-D"
/// - `device_list_command`: `aplay -l`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TtsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_speaker_keyword")]
    pub speaker_keyword: String,
    #[serde(default = "default_synth_command")]
    pub synth_command: Vec<String>,
    #[serde(default = "default_player_command")]
    pub player_command: Vec<String>,
    #[serde(default = "default_device_flag")]
    pub device_flag: String,
    #[serde(default = "default_device_list_command")]
    pub device_list_command: Vec<String>,
}

/// 음성 입력 설정
///
/// `command`가 비어 있으면 현재 실행 파일을 `voice` 하위 명령으로 실행한다.
///
/// # 기본값
///
/// - `microphone_keyword`: "USB"
/// - `sample_rate`: 48000 Hz
/// - `record_seconds`: 3
/// - `confirm_record_seconds`: 3
/// - `retry_delay_ms`: 1000
/// - `max_attempts`: 0 (무제한, 양수면 그 횟수 후 포기)
/// - `yes_no_playback`: background
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default = "default_microphone_keyword")]
    pub microphone_keyword: String,
    #[serde(default = "default_voice_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_record_seconds")]
    pub record_seconds: u64,
    #[serde(default = "default_record_seconds")]
    pub confirm_record_seconds: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_yes_no_playback")]
    pub yes_no_playback: Playback,
}

/// 음성 인식(STT) 설정
///
/// `credentials_path` 파일에는 API 키 한 줄이 들어 있어야 한다.
///
/// # 기본값
///
/// - `endpoint`: Google Cloud Speech-to-Text v1 `speech:recognize`
/// - `credentials_path`: "stt_api_key.txt"
/// - `language_code`: "ko-KR"
/// - `timeout_seconds`: 10
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SttConfig {
    #[serde(default = "default_stt_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: String,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// 버스 도착 정보 조회 설정
///
/// `routes`는 노선 번호 → 노선 ID 대응표. `command`가 비어 있으면
/// 현재 실행 파일을 `lookup` 하위 명령으로 실행한다.
///
/// # 기본값
///
/// - `endpoint`: 경기도 버스도착정보 v2 `getBusArrivalItemv2`
/// - `station_id`: "228000723"
/// - `sta_order`: "56"
/// - `timeout_seconds`: 10
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default = "default_lookup_endpoint")]
    pub endpoint: String,
    /// 공공데이터포털 서비스 키 (URL 인코딩된 값 그대로)
    #[serde(default)]
    pub service_key: String,
    #[serde(default = "default_station_id")]
    pub station_id: String,
    #[serde(default = "default_sta_order")]
    pub sta_order: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_routes")]
    pub routes: BTreeMap<String, String>,
}

/// 로그 설정
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default functions
fn default_list_path() -> String {
    "bus_number.txt".to_string()
}

fn default_serial_device() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud_rate() -> u32 {
    115200
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

fn default_speaker_keyword() -> String {
    "USB".to_string()
}

fn default_synth_command() -> Vec<String> {
    ["espeak-ng", "-v", "ko", "-w", "{output}", "{text}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_player_command() -> Vec<String> {
    vec!["aplay".to_string(), "-q".to_string()]
}

fn default_device_flag() -> String {
    "-D".to_string()
}

fn default_device_list_command() -> Vec<String> {
    vec!["aplay".to_string(), "-l".to_string()]
}

fn default_microphone_keyword() -> String {
    "USB".to_string()
}

fn default_voice_sample_rate() -> u32 {
    48000
}

fn default_record_seconds() -> u64 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    0
}

fn default_yes_no_playback() -> Playback {
    Playback::Background
}

fn default_stt_endpoint() -> String {
    "https://speech.googleapis.com/v1/speech:recognize".to_string()
}

fn default_credentials_path() -> String {
    "stt_api_key.txt".to_string()
}

fn default_language_code() -> String {
    "ko-KR".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_lookup_endpoint() -> String {
    "http://apis.data.go.kr/6410000/busarrivalservice/v2/getBusArrivalItemv2".to_string()
}

fn default_station_id() -> String {
    "228000723".to_string()
}

fn default_sta_order() -> String {
    "56".to_string()
}

fn default_routes() -> BTreeMap<String, String> {
    [
        ("5100", "200000115"),
        ("7000", "200000112"),
        ("1112", "234000016"),
        ("M5107", "234001243"),
    ]
    .iter()
    .map(|(bus, route)| (bus.to_string(), route.to_string()))
    .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            serial: SerialConfig::default(),
            keypad: KeypadConfig::default(),
            indicator: IndicatorConfig::default(),
            tts: TtsConfig::default(),
            voice: VoiceConfig::default(),
            stt: SttConfig::default(),
            lookup: LookupConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            list_path: default_list_path(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_serial_device(),
            baud_rate: default_baud_rate(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            echo_keys: default_true(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            speaker_keyword: default_speaker_keyword(),
            synth_command: default_synth_command(),
            player_command: default_player_command(),
            device_flag: default_device_flag(),
            device_list_command: default_device_list_command(),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            microphone_keyword: default_microphone_keyword(),
            sample_rate: default_voice_sample_rate(),
            record_seconds: default_record_seconds(),
            confirm_record_seconds: default_record_seconds(),
            retry_delay_ms: default_retry_delay_ms(),
            max_attempts: default_max_attempts(),
            yes_no_playback: default_yes_no_playback(),
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: default_stt_endpoint(),
            credentials_path: default_credentials_path(),
            language_code: default_language_code(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            endpoint: default_lookup_endpoint(),
            service_key: String::new(),
            station_id: default_station_id(),
            sta_order: default_sta_order(),
            timeout_seconds: default_timeout_seconds(),
            routes: default_routes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// 설정 파일 읽기
    ///
    /// TOML 형식의 설정 파일을 해석한다. 빠진 항목은 기본값을 쓴다.
    ///
    /// # Errors
    ///
    /// 파일을 읽지 못하거나 해석에 실패하면 오류를 돌려준다.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use bus_kiosk::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("설정 파일 읽기 실패: {:?}", path.as_ref()))?;
        let config: Config = toml::from_str(&content).with_context(|| "설정 파일 해석 실패")?;
        Ok(config)
    }

    /// 기본 설정을 파일로 저장 (기존 파일은 덮어씀)
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config).with_context(|| "설정 직렬화 실패")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("설정 파일 쓰기 실패: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 설정 파일이 있으면 읽고, 없으면 기본 설정
    ///
    /// # Errors
    ///
    /// 파일이 있는데 해석에 실패한 경우에만 오류.
    /// 로거 초기화 전에 불리므로 여기서는 로그를 남기지 않는다.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Config::default())
        }
    }
}
