use crate::grammar::BusId;
use crate::types::{AddOutcome, RegistryEvent, RemoveOutcome};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 등록된 버스 목록
///
/// 메모리 상의 집합과 줄 단위 텍스트 파일을 1:1로 유지한다.
/// 변경은 항상 "메모리 갱신 → 파일 전체 재기록" 순서이며,
/// 파일은 임시 파일에 쓴 뒤 교체하므로 이전 내용이 깨지지 않는다.
///
/// 스피커/LED 같은 부수 효과는 직접 일으키지 않고 [`RegistryEvent`]로 쌓아 둔다.
/// 호출자는 [`RegisteredBuses::drain_events`]로 꺼내서 처리한다.
///
/// # Examples
///
/// ```no_run
/// # use bus_kiosk::registry::RegisteredBuses;
/// # use bus_kiosk::grammar::BusId;
/// let mut buses = RegisteredBuses::new("bus_number.txt");
/// buses.clear_and_delete().unwrap();
/// buses.add(&BusId::parse("5100").unwrap()).unwrap();
/// assert!(buses.any_active());
/// ```
#[derive(Debug)]
pub struct RegisteredBuses {
    path: PathBuf,
    buses: BTreeSet<String>,
    events: Vec<RegistryEvent>,
}

impl RegisteredBuses {
    /// 빈 목록 생성 (파일은 건드리지 않음)
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            buses: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    /// 파일 내용을 읽어 들인 목록 생성
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut registry = Self::new(path);
        registry.sync_from_file()?;
        registry.events.clear();
        Ok(registry)
    }

    /// 버스 등록
    ///
    /// 이미 있으면 파일을 건드리지 않고 `AlreadyPresent`.
    pub fn add(&mut self, bus: &BusId) -> Result<AddOutcome> {
        if self.buses.contains(bus.as_str()) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        self.buses.insert(bus.as_str().to_string());
        self.persist()?;
        log::info!("{:?}에 저장 완료: {}", self.path, bus);

        self.events.push(RegistryEvent::Indicator { active: true });
        Ok(AddOutcome::Added)
    }

    /// 버스 제거
    ///
    /// 목록에 없으면 로그만 남기고 `NotFound`. 제거되면 도착 이벤트가,
    /// 목록이 비면 추가로 전체 완료 이벤트가 쌓인다.
    pub fn remove(&mut self, bus: &str) -> Result<RemoveOutcome> {
        if !self.buses.remove(bus) {
            log::warn!("제거 요청된 버스({})가 목록에 없습니다.", bus);
            return Ok(RemoveOutcome::NotFound);
        }

        self.persist()?;
        log::info!("목록 및 파일에서 제거: {}", bus);

        self.events.push(RegistryEvent::Arrived(bus.to_string()));
        if self.buses.is_empty() {
            self.events.push(RegistryEvent::AllComplete);
        }
        self.events.push(RegistryEvent::Indicator {
            active: self.any_active(),
        });
        Ok(RemoveOutcome::Removed)
    }

    /// 파일 내용으로 메모리 상태를 다시 만든다
    ///
    /// 다른 프로세스(음성 파이프라인)가 파일을 직접 고친 뒤 호출한다.
    /// 각 줄은 공백을 잘라내고 빈 줄은 버린다. 파일이 없으면 빈 목록.
    pub fn sync_from_file(&mut self) -> Result<()> {
        self.buses = match fs::read_to_string(&self.path) {
            Ok(content) => parse_list(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("버스 목록 파일 읽기 실패: {:?}", self.path))
            }
        };

        self.events.push(RegistryEvent::Indicator {
            active: self.any_active(),
        });
        Ok(())
    }

    /// 메모리 상태를 비우고 파일을 삭제 (시작 시 이전 세션 정리용)
    pub fn clear_and_delete(&mut self) -> Result<()> {
        self.buses.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => log::info!("이전 버스 목록 파일을 삭제했습니다: {:?}", self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("버스 목록 파일 삭제 실패: {:?}", self.path))
            }
        }

        self.events.push(RegistryEvent::Indicator { active: false });
        Ok(())
    }

    /// 쌓인 이벤트를 발생 순서대로 꺼낸다
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn contains(&self, bus: &str) -> bool {
        self.buses.contains(bus)
    }

    /// 등록된 버스가 하나라도 있는지 (표시등 상태)
    pub fn any_active(&self) -> bool {
        !self.buses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    /// 정렬된 순서로 순회
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.buses.iter().map(String::as_str)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 전체 목록을 정렬된 순서로 파일에 다시 쓴다 (임시 파일 → 교체)
    fn persist(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("디렉터리 생성 실패: {:?}", parent))?;

        let temp = NamedTempFile::new_in(parent)
            .with_context(|| format!("임시 파일 생성 실패: {:?}", parent))?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            for bus in &self.buses {
                writeln!(writer, "{}", bus).context("버스 목록 쓰기 실패")?;
            }
            writer.flush().context("버스 목록 쓰기 실패")?;
        }
        temp.persist(&self.path)
            .with_context(|| format!("버스 목록 파일 교체 실패: {:?}", self.path))?;
        Ok(())
    }
}

/// 목록 파일 내용 해석 (공백 제거, 빈 줄 무시, 중복 제거, 정렬)
pub fn parse_list(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
