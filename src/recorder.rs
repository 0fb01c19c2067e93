use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 고정 시간 마이크 녹음
///
/// 장치 이름에 키워드가 들어간 첫 입력 장치를 쓰고, 없으면 기본 입력 장치를 쓴다.
/// 여러 채널 장치라면 첫 번째 채널만 모노로 남긴다.
#[derive(Debug, Clone)]
pub struct Microphone {
    keyword: String,
    sample_rate: u32,
}

impl Microphone {
    pub fn new(keyword: &str, sample_rate: u32) -> Self {
        Self {
            keyword: keyword.to_string(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// 지정 시간 동안 녹음한 16비트 모노 샘플
    ///
    /// 장치가 없거나 스트림 오류가 나면 오류를 돌려준다.
    pub async fn record(&self, duration: Duration) -> Result<Vec<i16>> {
        let keyword = self.keyword.clone();
        let sample_rate = self.sample_rate;
        tokio::task::spawn_blocking(move || capture(&keyword, sample_rate, duration))
            .await
            .context("녹음 작업이 중단되었습니다")?
    }

    /// 입력 장치 목록 출력
    pub fn list_devices() -> Result<()> {
        let host = cpal::default_host();
        println!("사용 가능한 입력 장치:");
        println!();

        for (idx, device) in host.input_devices()?.enumerate() {
            let name = device.name()?;
            println!("  [{}] {}", idx, name);

            device.supported_input_configs()?.for_each(|config_range| {
                println!(
                    "      형식: {:?}, {}-{}Hz, {}ch",
                    config_range.sample_format(),
                    config_range.min_sample_rate().0,
                    config_range.max_sample_rate().0,
                    config_range.channels()
                );
            });
            println!();
        }

        Ok(())
    }
}

/// PCM 샘플을 리틀엔디언 바이트열로
pub fn pcm_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn find_device(host: &cpal::Host, keyword: &str) -> Result<cpal::Device> {
    let keyword = keyword.to_lowercase();
    if !keyword.is_empty() {
        for device in host.input_devices()? {
            if let Ok(name) = device.name() {
                if name.to_lowercase().contains(&keyword) {
                    log::info!("마이크 장치 찾음: {}", name);
                    return Ok(device);
                }
            }
        }
        log::warn!("'{}' 마이크를 찾지 못했습니다.", keyword);
    }

    let device = host
        .default_input_device()
        .context("기본 입력 장치가 없습니다")?;
    log::info!("기본 입력 장치 사용: {:?}", device.name());
    Ok(device)
}

fn capture(keyword: &str, sample_rate: u32, duration: Duration) -> Result<Vec<i16>> {
    let host = cpal::default_host();
    let device = find_device(&host, keyword)?;
    let default_config = device
        .default_input_config()
        .context("기본 입력 설정을 가져올 수 없습니다")?;

    let channels = default_config.channels();
    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let samples = Arc::new(Mutex::new(Vec::with_capacity(
        (sample_rate as f64 * duration.as_secs_f64()) as usize,
    )));

    let stream = match default_config.sample_format() {
        cpal::SampleFormat::F32 => {
            build_stream::<f32>(&device, &stream_config, channels, samples.clone())?
        }
        cpal::SampleFormat::I16 => {
            build_stream::<i16>(&device, &stream_config, channels, samples.clone())?
        }
        cpal::SampleFormat::U16 => {
            build_stream::<u16>(&device, &stream_config, channels, samples.clone())?
        }
        cpal::SampleFormat::I32 => {
            build_stream::<i32>(&device, &stream_config, channels, samples.clone())?
        }
        other => anyhow::bail!("지원하지 않는 샘플 형식: {:?}", other),
    };

    log::info!("마이크 녹음 시작... ({:.1}초)", duration.as_secs_f64());
    stream.play().context("녹음 스트림 시작 실패")?;
    std::thread::sleep(duration);
    drop(stream);
    log::info!("녹음 완료.");

    let recorded = samples
        .lock()
        .map_err(|_| anyhow::anyhow!("녹음 버퍼 잠금 실패"))?
        .clone();
    Ok(recorded)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: u16,
    samples: Arc<Mutex<Vec<i16>>>,
) -> Result<cpal::Stream>
where
    T: SizedSample + Send + 'static,
    i16: FromSample<T>,
{
    let channels = channels.max(1) as usize;

    let data_callback = move |data: &[T], _info: &cpal::InputCallbackInfo| {
        // 인터리브된 프레임에서 첫 채널만 사용
        let mono = data.chunks(channels).map(|frame| i16::from_sample(frame[0]));
        if let Ok(mut buffer) = samples.lock() {
            buffer.extend(mono);
        }
    };

    let error_callback = move |err: cpal::StreamError| {
        log::error!("녹음 스트림 오류: {}", err);
    };

    device
        .build_input_stream(config, data_callback, error_callback, None)
        .context("입력 스트림 생성 실패")
}
