use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 등록 상태 표시등 (목록이 비어 있지 않으면 켜짐)
pub trait Indicator: Send {
    fn set(&mut self, on: bool) -> Result<()>;
}

/// sysfs GPIO 값 파일에 `1`/`0`을 써서 LED를 제어
///
/// 예: `/sys/class/gpio/gpio18/value` (핀 export와 방향 설정은 부팅 스크립트에서 한다)
pub struct SysfsLed {
    value_path: PathBuf,
    state: Option<bool>,
}

impl SysfsLed {
    pub fn new<P: AsRef<Path>>(value_path: P) -> Self {
        Self {
            value_path: value_path.as_ref().to_path_buf(),
            state: None,
        }
    }

    pub fn state(&self) -> Option<bool> {
        self.state
    }
}

impl Indicator for SysfsLed {
    fn set(&mut self, on: bool) -> Result<()> {
        fs::write(&self.value_path, if on { "1" } else { "0" })
            .with_context(|| format!("LED 제어 실패: {:?}", self.value_path))?;
        if self.state != Some(on) {
            log::debug!("LED {}", if on { "켜짐" } else { "꺼짐" });
        }
        self.state = Some(on);
        Ok(())
    }
}

/// LED 없이 상태 변화만 로그로 남긴다
#[derive(Debug, Default)]
pub struct LogIndicator {
    state: Option<bool>,
}

impl Indicator for LogIndicator {
    fn set(&mut self, on: bool) -> Result<()> {
        if self.state != Some(on) {
            log::info!("[표시등] {}", if on { "켜짐" } else { "꺼짐" });
        }
        self.state = Some(on);
        Ok(())
    }
}
