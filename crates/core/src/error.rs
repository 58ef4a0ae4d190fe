//! 에러 타입 -- 도메인별 에러 정의

/// testgate 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TestgateError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수신 이벤트 검증 에러
    #[error("ingress error: {0}")]
    Ingress(#[from] IngressError),

    /// 외부 협력자(kubectl, jmeter, git, 브로커) 호출 에러
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// 테스트 실행 중단 에러
    #[error("run aborted: {0}")]
    Run(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 수신 이벤트 검증 에러
///
/// 이 에러는 실행이 시작되기 전에 호출자에게 동기적으로 반환됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngressError {
    /// 선언된 이벤트 타입이 deployment-finished가 아님
    #[error("unexpected event type '{actual}', expected '{expected}'")]
    UnexpectedEventType { expected: String, actual: String },

    /// 페이로드 디코딩 실패
    #[error("failed to decode payload: {0}")]
    PayloadDecode(String),

    /// 엔벨로프 자체가 잘못됨
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

/// 외부 협력자 호출 에러
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// 워크로드 준비 대기 시간 초과
    #[error("readiness timeout: {0}")]
    ReadinessTimeout(String),

    /// 준비 상태 조회 자체가 실패함
    #[error("readiness probe failed: {0}")]
    ReadinessProbe(String),

    /// 소스 체크아웃 실패
    #[error("source fetch failed: {0}")]
    SourceFetch(String),

    /// 테스트 실행기 실패
    #[error("execution failed: {0}")]
    Execution(String),

    /// 설정 조회 실패
    #[error("config lookup failed: {0}")]
    ConfigLookup(String),

    /// 이벤트 발행 실패
    #[error("publish failed: {0}")]
    Publish(String),
}
