use anyhow::Result;
use bus_kiosk::config::{Config, TtsConfig};
use bus_kiosk::indicator::{Indicator, LogIndicator, SysfsLed};
use bus_kiosk::keypad::ConsoleKeypad;
use bus_kiosk::kiosk::{Devices, Kiosk};
use bus_kiosk::lookup::{resolve_targets, ArrivalLookup, Targets};
use bus_kiosk::pipeline::{LookupPipeline, PipelineCommand, ProcessExecutor, VoicePipeline};
use bus_kiosk::recorder::Microphone;
use bus_kiosk::registry::RegisteredBuses;
use bus_kiosk::serial::SerialLink;
use bus_kiosk::stt::GoogleSpeech;
use bus_kiosk::tts::{Announcer, CommandAnnouncer, LogAnnouncer};
use bus_kiosk::types::Playback;
use bus_kiosk::voice::{run_voice_session, MicrophoneListener};
use env_logger::Env;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 실행 모드
#[derive(Debug, PartialEq, Eq)]
enum Mode {
    /// 키오스크 메인 루프
    Kiosk,
    /// 음성 입력 세션 한 번
    Voice,
    /// 도착 정보 조회 (번호가 없으면 등록된 전체)
    Lookup(Option<String>),
    ShowInterfaces,
    GenerateConfig(String),
}

#[derive(Debug, PartialEq, Eq)]
struct Cli {
    mode: Mode,
    config_path: String,
}

/// 명령행 해석
///
/// - `bus-kiosk [config.toml]`
/// - `bus-kiosk voice [--config path]`
/// - `bus-kiosk lookup [번호] [--config path]`
/// - `bus-kiosk --generate-config [path]`
/// - `bus-kiosk --show-interfaces`
fn parse_args(args: &[String]) -> Cli {
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config_path = iter.next().cloned();
        } else {
            positional.push(arg.as_str());
        }
    }

    let mode = match positional.as_slice() {
        ["--show-interfaces", ..] => Mode::ShowInterfaces,
        ["--generate-config", rest @ ..] => Mode::GenerateConfig(
            rest.first()
                .map(|s| s.to_string())
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
        ),
        ["voice", ..] => Mode::Voice,
        ["lookup", rest @ ..] => Mode::Lookup(rest.first().map(|s| s.to_string())),
        [path, ..] if !path.starts_with("--") => {
            config_path.get_or_insert_with(|| path.to_string());
            Mode::Kiosk
        }
        _ => Mode::Kiosk,
    };

    Cli {
        mode,
        config_path: config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args);

    // 장치 목록 출력과 설정 파일 생성은 설정 없이 동작
    match &cli.mode {
        Mode::ShowInterfaces => {
            init_logger("info");
            Microphone::list_devices()?;
            return Ok(());
        }
        Mode::GenerateConfig(path) => {
            init_logger("info");
            Config::write_default(path)?;
            println!("설정 파일을 생성했습니다: {}", path);
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load_or_default(&cli.config_path)?;
    init_logger(&config.logging.level);
    if !Path::new(&cli.config_path).exists() {
        log::warn!(
            "설정 파일이 없습니다. 기본 설정을 사용합니다: {}",
            cli.config_path
        );
    }
    log::debug!("설정: {:?}", config);

    match cli.mode {
        Mode::Voice => run_voice(&config).await,
        Mode::Lookup(bus) => run_lookup(&config, bus.as_deref()).await,
        _ => run_kiosk(&config, &cli.config_path).await,
    }
}

/// 로거 초기화 (RUST_LOG가 있으면 그쪽이 우선)
fn init_logger(level: &str) {
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

async fn build_announcer(config: &TtsConfig) -> Box<dyn Announcer> {
    if config.enabled {
        Box::new(CommandAnnouncer::detect(config).await)
    } else {
        Box::new(LogAnnouncer)
    }
}

#[cfg(unix)]
fn open_serial(config: &Config) -> Result<Box<dyn SerialLink>> {
    let serial = bus_kiosk::serial::TtySerial::open(
        &config.serial.device,
        config.serial.baud_rate,
        Duration::from_millis(config.serial.settle_ms),
    )?;
    Ok(Box::new(serial))
}

#[cfg(not(unix))]
fn open_serial(_config: &Config) -> Result<Box<dyn SerialLink>> {
    anyhow::bail!("이 플랫폼에서는 시리얼 장치를 지원하지 않습니다")
}

async fn run_kiosk(config: &Config, config_path: &str) -> Result<()> {
    log::info!("bus-kiosk 를 시작합니다");

    let announcer = build_announcer(&config.tts).await;

    let serial = match open_serial(config) {
        Ok(serial) => serial,
        Err(e) => {
            log::error!("{:#}", e);
            announcer
                .announce("시리얼 장치 연결을 확인해주세요.", Playback::Blocking)
                .await;
            std::process::exit(1);
        }
    };

    let indicator: Box<dyn Indicator> = match &config.indicator.led_value_path {
        Some(path) => Box::new(SysfsLed::new(path)),
        None => Box::new(LogIndicator::default()),
    };

    let config_path = Path::new(config_path);
    let voice = VoicePipeline::new(
        Box::new(ProcessExecutor),
        PipelineCommand::resolve(&config.voice.command, "voice", config_path)?,
    );
    let lookup = LookupPipeline::new(
        Box::new(ProcessExecutor),
        PipelineCommand::resolve(&config.lookup.command, "lookup", config_path)?,
    );

    let devices = Devices {
        serial,
        keypad: Box::new(ConsoleKeypad::spawn()),
        indicator,
        announcer,
    };
    let mut kiosk = Kiosk::new(
        RegisteredBuses::new(&config.storage.list_path),
        devices,
        voice,
        lookup,
        &config.keypad,
    );

    // Ctrl+C 핸들러
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        log::info!("종료(Ctrl+C)");
        running_clone.store(false, Ordering::SeqCst);
    })?;

    let result = match kiosk.start().await {
        Ok(()) => {
            kiosk.run(&running).await;
            Ok(())
        }
        Err(e) => Err(e),
    };

    log::info!("정리 작업을 시작합니다...");
    kiosk.shutdown();
    drop(kiosk);

    log::info!("bus-kiosk 를 종료했습니다");
    result
}

async fn run_voice(config: &Config) -> Result<()> {
    let announcer = build_announcer(&config.tts).await;

    let recognizer = match GoogleSpeech::new(&config.stt, config.voice.sample_rate) {
        Ok(recognizer) => recognizer,
        Err(e) => {
            log::error!("[치명적 오류] {:#}", e);
            announcer
                .announce(
                    "시스템 설정에 문제가 있어 음성 인식을 시작할 수 없습니다.",
                    Playback::Blocking,
                )
                .await;
            std::process::exit(1);
        }
    };

    let microphone = Microphone::new(&config.voice.microphone_keyword, config.voice.sample_rate);
    let mut listener = MicrophoneListener::new(microphone, recognizer);

    let confirmed = run_voice_session(
        &mut listener,
        announcer.as_ref(),
        &config.voice,
        Path::new(&config.storage.list_path),
    )
    .await?;

    match confirmed {
        Some(bus) => {
            println!("CONFIRMED_BUS:{}", bus);
            Ok(())
        }
        None => std::process::exit(1),
    }
}

async fn run_lookup(config: &Config, bus: Option<&str>) -> Result<()> {
    let announcer = build_announcer(&config.tts).await;

    let speech = match resolve_targets(bus, Path::new(&config.storage.list_path)) {
        Targets::Nothing(message) => message.to_string(),
        Targets::Buses(buses) => {
            let lookup = ArrivalLookup::new(&config.lookup)?;
            lookup.report_all(&buses).await
        }
    };

    println!("{}", speech);
    announcer.announce(&speech, Playback::Blocking).await;
    Ok(())
}
