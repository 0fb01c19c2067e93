//! 음성 입력/도착 정보 조회 파이프라인 실행
//!
//! 두 파이프라인은 별도 프로세스로 실행되고 메인 루프는 끝날 때까지 기다린다.
//! 실행 방식은 [`CommandExecutor`] 뒤에 숨겨져 있어 테스트에서 가짜로 바꿀 수 있다.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// 음성 파이프라인이 확정 번호를 알리는 출력 줄의 접두어
pub const CONFIRMED_PREFIX: &str = "CONFIRMED_BUS:";

/// 외부 명령 실행 결과
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
}

/// 외부 명령 실행기
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// 명령을 실행하고 끝날 때까지 기다린다
    ///
    /// 실행 자체가 불가능하면 오류, 실행됐지만 실패한 경우는 `success: false`.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// 실제 프로세스로 실행 (표준 오류는 그대로 이어받음)
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .await
            .with_context(|| format!("명령 실행 실패: {}", program))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }
}

/// 실행할 명령 (프로그램 + 인자)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PipelineCommand {
    /// 설정된 명령이 있으면 그대로, 없으면 현재 실행 파일의 하위 명령
    ///
    /// 하위 명령에는 같은 설정 파일을 `--config`로 넘긴다.
    pub fn resolve(configured: &[String], subcommand: &str, config_path: &Path) -> Result<Self> {
        if let Some((program, args)) = configured.split_first() {
            return Ok(Self {
                program: program.clone(),
                args: args.to_vec(),
            });
        }

        let exe: PathBuf = std::env::current_exe().context("현재 실행 파일 경로를 알 수 없습니다")?;
        Ok(Self {
            program: exe.to_string_lossy().to_string(),
            args: vec![
                subcommand.to_string(),
                "--config".to_string(),
                config_path.to_string_lossy().to_string(),
            ],
        })
    }
}

/// 음성 파이프라인 결과
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoiceOutcome {
    /// 사용자가 확인한 번호
    Confirmed(String),
    /// 비정상 종료 또는 확정 번호 없음
    Failed,
}

/// 표준 출력에서 `CONFIRMED_BUS:<번호>` 줄을 찾는다
///
/// # Examples
///
/// ```
/// # use bus_kiosk::pipeline::parse_confirmed;
/// assert_eq!(parse_confirmed("log\nCONFIRMED_BUS:M5107\n").as_deref(), Some("M5107"));
/// assert_eq!(parse_confirmed("CONFIRMED_BUS:\n"), None);
/// ```
pub fn parse_confirmed(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter(|line| line.contains(CONFIRMED_PREFIX))
        .find_map(|line| {
            let bus = line.split(':').nth(1)?.trim();
            if bus.is_empty() {
                None
            } else {
                Some(bus.to_string())
            }
        })
}

/// 음성 입력 파이프라인
pub struct VoicePipeline {
    executor: Box<dyn CommandExecutor>,
    command: PipelineCommand,
}

impl VoicePipeline {
    pub fn new(executor: Box<dyn CommandExecutor>, command: PipelineCommand) -> Self {
        Self { executor, command }
    }

    pub async fn run(&self) -> VoiceOutcome {
        log::info!("음성 인식 파이프라인 실행: {}", self.command.program);
        let output = match self.executor.run(&self.command.program, &self.command.args).await {
            Ok(output) => output,
            Err(e) => {
                log::error!("음성 인식 파이프라인 실행 실패: {:#}", e);
                return VoiceOutcome::Failed;
            }
        };

        if !output.success {
            log::error!("음성 인식 모듈이 오류와 함께 종료되었습니다.");
            return VoiceOutcome::Failed;
        }

        match parse_confirmed(&output.stdout) {
            Some(bus) => {
                log::info!("음성 인식으로 확인된 번호: {}", bus);
                VoiceOutcome::Confirmed(bus)
            }
            None => {
                log::error!(
                    "음성 인식 결과에서 최종 버스 번호를 파싱하지 못했습니다. 출력: {}",
                    output.stdout.trim()
                );
                VoiceOutcome::Failed
            }
        }
    }
}

/// 도착 정보 조회 파이프라인
pub struct LookupPipeline {
    executor: Box<dyn CommandExecutor>,
    command: PipelineCommand,
}

impl LookupPipeline {
    pub fn new(executor: Box<dyn CommandExecutor>, command: PipelineCommand) -> Self {
        Self { executor, command }
    }

    /// 번호 하나 또는 (None이면) 등록된 전체 버스를 조회
    ///
    /// 실패는 로그만 남긴다.
    pub async fn run(&self, bus: Option<&str>) -> bool {
        let mut args = self.command.args.clone();
        if let Some(bus) = bus {
            args.push(bus.to_string());
        }

        match self.executor.run(&self.command.program, &args).await {
            Ok(output) if output.success => {
                for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
                    log::info!("[조회] {}", line);
                }
                true
            }
            Ok(_) => {
                log::error!("정보 처리 모듈에서 오류가 발생했습니다.");
                false
            }
            Err(e) => {
                log::error!("도착 정보 조회 실행 실패: {:#}", e);
                false
            }
        }
    }
}
