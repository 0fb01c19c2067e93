use anyhow::Result;

/// 마이크로컨트롤러와의 줄 단위 시리얼 통신
pub trait SerialLink: Send {
    /// 완성된 한 줄을 읽는다. 아직 없으면 대기하지 않고 None
    fn read_line(&mut self) -> Result<Option<String>>;

    /// 한 줄을 보낸다 (줄바꿈은 구현이 붙인다)
    fn write_line(&mut self, line: &str) -> Result<()>;
}

/// 줄바꿈 없이 쌓을 수 있는 최대 바이트 수
pub const MAX_PENDING_BYTES: usize = 4096;

/// 수신 바이트를 모아 줄 단위로 잘라 주는 버퍼
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 수신 바이트 추가
    ///
    /// 완성되지 않은 줄이 `MAX_PENDING_BYTES`를 넘으면 그 부분을 버린다.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() <= MAX_PENDING_BYTES {
            return;
        }
        let unterminated = match self.pending.iter().rposition(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None => 0,
        };
        if self.pending.len() - unterminated > MAX_PENDING_BYTES {
            log::warn!(
                "줄바꿈 없는 시리얼 데이터 {}바이트를 버립니다",
                self.pending.len() - unterminated
            );
            self.pending.truncate(unterminated);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 앞에서부터 완성된 줄 하나를 꺼낸다 (앞뒤 공백 제거, 빈 줄은 건너뜀)
    pub fn next_line(&mut self) -> Option<String> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }
}

#[cfg(unix)]
pub use tty::TtySerial;

#[cfg(unix)]
mod tty {
    use super::{LineBuffer, SerialLink};
    use anyhow::{Context, Result};
    use nix::fcntl::OFlag;
    use nix::sys::termios::{self, BaudRate, SetArg};
    use std::fs::{File, OpenOptions};
    use std::io::{self, Read, Write};
    use std::os::unix::fs::OpenOptionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    /// termios로 설정한 tty 장치 (raw, 논블로킹)
    pub struct TtySerial {
        path: PathBuf,
        file: File,
        lines: LineBuffer,
    }

    impl TtySerial {
        /// 장치를 열고 통신 속도를 설정한다
        ///
        /// 장치가 열리면서 마이크로컨트롤러가 재시작하므로 `settle`만큼 기다린다.
        pub fn open<P: AsRef<Path>>(path: P, baud_rate: u32, settle: Duration) -> Result<Self> {
            let path = path.as_ref().to_path_buf();
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags((OFlag::O_NOCTTY | OFlag::O_NONBLOCK).bits())
                .open(&path)
                .with_context(|| format!("시리얼 포트를 열 수 없습니다: {:?}", path))?;

            let mut settings = termios::tcgetattr(&file)
                .with_context(|| format!("시리얼 설정 조회 실패: {:?}", path))?;
            termios::cfmakeraw(&mut settings);
            termios::cfsetspeed(&mut settings, baud(baud_rate)?)
                .context("시리얼 통신 속도 설정 실패")?;
            termios::tcsetattr(&file, SetArg::TCSANOW, &settings)
                .with_context(|| format!("시리얼 설정 적용 실패: {:?}", path))?;

            log::info!("시리얼 포트 열림: {:?} ({} bps)", path, baud_rate);
            std::thread::sleep(settle);

            Ok(Self {
                path,
                file,
                lines: LineBuffer::new(),
            })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl SerialLink for TtySerial {
        fn read_line(&mut self) -> Result<Option<String>> {
            let mut chunk = [0u8; 256];
            loop {
                match self.file.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => self.lines.extend(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        return Err(e).with_context(|| format!("시리얼 읽기 실패: {:?}", self.path))
                    }
                }
            }
            Ok(self.lines.next_line())
        }

        fn write_line(&mut self, line: &str) -> Result<()> {
            self.file
                .write_all(format!("{}\n", line).as_bytes())
                .and_then(|_| self.file.flush())
                .with_context(|| format!("시리얼 쓰기 실패: {:?}", self.path))
        }
    }

    impl Drop for TtySerial {
        fn drop(&mut self) {
            log::info!("시리얼 포트를 닫습니다: {:?}", self.path);
        }
    }

    fn baud(rate: u32) -> Result<BaudRate> {
        Ok(match rate {
            9600 => BaudRate::B9600,
            19200 => BaudRate::B19200,
            38400 => BaudRate::B38400,
            57600 => BaudRate::B57600,
            115200 => BaudRate::B115200,
            other => anyhow::bail!("지원하지 않는 통신 속도: {}", other),
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_supported_baud_rates() {
            assert!(baud(115200).is_ok());
            assert!(baud(9600).is_ok());
            assert!(baud(12345).is_err());
        }

        #[test]
        fn test_open_missing_device_fails() {
            let result = TtySerial::open("/dev/does-not-exist-tty", 115200, Duration::ZERO);
            assert!(result.is_err());
        }
    }
}
