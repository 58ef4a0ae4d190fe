//! JMeter 요약 출력 파서
//!
//! non-GUI 모드의 JMeter는 주기적으로 다음과 같은 요약 줄을 출력합니다.
//!
//! ```text
//! summary +      1 in 00:00:01 =    1.2/s Avg:    80 Min:    80 Max:    80 Err:     0 (0.00%) Active: 1
//! summary =     10 in 00:00:05 =    2.0/s Avg:    75 Min:    60 Max:    99 Err:     1 (10.00%)
//! ```
//!
//! `summary =` 줄은 누적값이며, 마지막 줄이 실행 전체의 결과입니다.

use regex::Regex;

use crate::error::IntegrationError;

const SUMMARY_PATTERN: &str = r"^summary\s*=\s*(\d+)\s+in\b.*?\bErr:\s*(\d+)";

/// 누적 요약 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// 전송한 샘플 수
    pub samples: u64,
    /// 실패한 샘플 수
    pub errors: u64,
}

impl RunSummary {
    /// 에러 없이 끝났는지 여부
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

/// 요약 줄 파서
#[derive(Debug, Clone)]
pub struct SummaryParser {
    pattern: Regex,
}

impl SummaryParser {
    /// 파서를 생성합니다.
    pub fn new() -> Result<Self, IntegrationError> {
        let pattern = Regex::new(SUMMARY_PATTERN)
            .map_err(|e| IntegrationError::Execution(format!("invalid summary pattern: {e}")))?;
        Ok(Self { pattern })
    }

    /// 출력에서 마지막 누적 요약을 찾습니다. 없으면 `None`입니다.
    pub fn final_summary(&self, output: &str) -> Option<RunSummary> {
        output
            .lines()
            .rev()
            .find_map(|line| self.parse_line(line.trim()))
    }

    fn parse_line(&self, line: &str) -> Option<RunSummary> {
        let caps = self.pattern.captures(line)?;
        let samples = caps.get(1)?.as_str().parse().ok()?;
        let errors = caps.get(2)?.as_str().parse().ok()?;
        Some(RunSummary { samples, errors })
    }
}
