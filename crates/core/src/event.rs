//! 이벤트 엔벨로프 -- 이벤트 버스로 주고받는 CloudEvents v0.2 메시지
//!
//! [`CloudEvent`]는 수신/발신 모두에 사용되는 엔벨로프이며,
//! 상관관계 ID(`shkeptncontext`)는 페이로드가 아니라 엔벨로프 확장 속성으로 전달됩니다.
//!
//! 발신 페이로드는 원본 페이로드 객체에 필드 하나를 더한 형태입니다.
//! [`TestsFinishedData`]와 [`EvaluationDoneData`]는 원본을 복제해 새 값을 만들기 때문에
//! 원본 필드는 구성 단계에서 그대로 보존됩니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IngressError;

// --- 이벤트 타입 상수 ---

/// 수신 대상 이벤트 타입
pub const EVENT_TYPE_DEPLOYMENT_FINISHED: &str = "sh.keptn.events.deployment-finished";
/// 테스트 통과 시 발행하는 이벤트 타입
pub const EVENT_TYPE_TESTS_FINISHED: &str = "sh.keptn.events.tests-finished";
/// 테스트/헬스 체크 실패 시 발행하는 이벤트 타입
pub const EVENT_TYPE_EVALUATION_DONE: &str = "sh.keptn.events.evaluation-done";

// --- 엔벨로프 상수 ---

/// CloudEvents 사양 버전
pub const SPEC_VERSION: &str = "0.2";
/// 상관관계 ID 확장 속성 이름
pub const EXTENSION_KEPTN_CONTEXT: &str = "shkeptncontext";
/// 발신 이벤트의 source 식별자
pub const SOURCE_JMETER_SERVICE: &str = "jmeter-service";
/// 발신 이벤트의 데이터 content type
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// structured 모드 HTTP content type
pub const CONTENT_TYPE_CLOUDEVENTS_JSON: &str = "application/cloudevents+json";

/// 발신 페이로드에 추가되는 시작 시각 필드
pub const FIELD_STARTED_AT: &str = "startedat";
/// 발신 페이로드에 추가되는 평가 결과 필드
pub const FIELD_EVALUATION_PASSED: &str = "evaluationpassed";

/// CloudEvents v0.2 엔벨로프
///
/// 알려지지 않은 최상위 속성은 모두 `extensions`에 보존됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    /// 사양 버전
    pub specversion: String,
    /// 이벤트 고유 ID
    pub id: String,
    /// 선언된 이벤트 타입
    #[serde(rename = "type")]
    pub event_type: String,
    /// 이벤트 생성자
    pub source: String,
    /// 생성 시각 (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// 데이터 content type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contenttype: Option<String>,
    /// 페이로드
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// 확장 속성 (`shkeptncontext` 등)
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl CloudEvent {
    /// structured 모드 본문(엔벨로프 JSON)을 디코딩합니다.
    pub fn from_structured(body: &[u8]) -> Result<Self, IngressError> {
        serde_json::from_slice(body).map_err(|e| IngressError::MalformedEnvelope(e.to_string()))
    }

    /// binary 모드 요청을 디코딩합니다.
    ///
    /// `ce-` 접두어 헤더가 엔벨로프 속성이 되고, 본문은 데이터가 됩니다.
    /// 본문이 JSON이 아니면 문자열 데이터로 보존하여 이후 페이로드 검증 단계에서 거부됩니다.
    pub fn from_binary<'a>(
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
        body: &[u8],
    ) -> Result<Self, IngressError> {
        let mut specversion = None;
        let mut id = None;
        let mut event_type = None;
        let mut source = None;
        let mut time = None;
        let mut contenttype = None;
        let mut extensions = Map::new();

        for (name, value) in headers {
            let name = name.to_ascii_lowercase();
            if name == "content-type" {
                contenttype = Some(value.to_owned());
                continue;
            }
            let Some(attr) = name.strip_prefix("ce-") else {
                continue;
            };
            match attr {
                "specversion" => specversion = Some(value.to_owned()),
                "id" => id = Some(value.to_owned()),
                "type" => event_type = Some(value.to_owned()),
                "source" => source = Some(value.to_owned()),
                "time" => time = Some(value.to_owned()),
                other => {
                    extensions.insert(other.to_owned(), Value::String(value.to_owned()));
                }
            }
        }

        let required = |field: Option<String>, header: &str| {
            field.ok_or_else(|| IngressError::MalformedEnvelope(format!("missing header ce-{header}")))
        };

        let data = if body.is_empty() {
            None
        } else {
            Some(
                serde_json::from_slice(body)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned())),
            )
        };

        Ok(Self {
            specversion: required(specversion, "specversion")?,
            id: required(id, "id")?,
            event_type: required(event_type, "type")?,
            source: required(source, "source")?,
            time,
            contenttype,
            data,
            extensions,
        })
    }

    /// 새 발신 이벤트를 생성합니다. ID는 매번 새로 발급됩니다.
    pub fn outgoing(
        event_type: impl Into<String>,
        source: impl Into<String>,
        keptn_context: impl Into<String>,
        data: Value,
    ) -> Self {
        let mut extensions = Map::new();
        extensions.insert(
            EXTENSION_KEPTN_CONTEXT.to_owned(),
            Value::String(keptn_context.into()),
        );
        Self {
            specversion: SPEC_VERSION.to_owned(),
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            source: source.into(),
            time: Some(Utc::now().to_rfc3339()),
            contenttype: Some(CONTENT_TYPE_JSON.to_owned()),
            data: Some(data),
            extensions,
        }
    }

    /// 문자열 확장 속성을 조회합니다.
    pub fn extension_str(&self, name: &str) -> Option<&str> {
        self.extensions.get(name).and_then(Value::as_str)
    }

    /// 상관관계 ID를 반환합니다. 없으면 빈 문자열입니다.
    pub fn keptn_context(&self) -> &str {
        self.extension_str(EXTENSION_KEPTN_CONTEXT).unwrap_or_default()
    }
}

impl fmt::Display for CloudEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 수신 ID는 임의의 UTF-8이므로 바이트가 아닌 문자 단위로 자름
        let short_id: String = self.id.chars().take(8).collect();
        write!(
            f,
            "CloudEvent[{short_id}] type={} source={} context={}",
            self.event_type,
            self.source,
            self.keptn_context(),
        )
    }
}

/// deployment-finished 페이로드
///
/// 누락된 필드는 빈 문자열로 채워집니다. 문자열이 아닌 값은 디코딩 에러입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentFinishedData {
    /// 테스트 계획 저장소를 소유한 GitHub 조직
    pub githuborg: String,
    /// 프로젝트명
    pub project: String,
    /// 테스트 전략 레이블
    pub teststrategy: String,
    /// 배포 전략 레이블
    pub deploymentstrategy: String,
    /// 스테이지명
    pub stage: String,
    /// 서비스명
    pub service: String,
    /// 컨테이너 이미지
    pub image: String,
    /// 이미지 태그
    pub tag: String,
}

impl DeploymentFinishedData {
    /// 배포 대상 네임스페이스 (`<project>-<stage>`)
    pub fn namespace(&self) -> String {
        format!("{}-{}", self.project, self.stage)
    }

    /// 클러스터 내부 가상 호스트 (`<service>.<project>-<stage>`)
    pub fn cluster_host(&self) -> String {
        format!("{}.{}", self.service, self.namespace())
    }

    /// 로그용 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Project: {}, Service: {}, Stage: {}, TestStrategy: {}",
            self.project, self.service, self.stage, self.teststrategy
        )
    }
}

/// 검증을 통과한 deployment-finished 알림
///
/// 타입이 지정된 뷰와 함께 원본 JSON 객체를 그대로 보관합니다.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentNotification {
    /// 수신 이벤트 ID
    pub event_id: String,
    /// 상관관계 ID (`shkeptncontext`)
    pub correlation_id: String,
    /// 타입이 지정된 페이로드
    pub data: DeploymentFinishedData,
    /// 원본 페이로드 객체
    pub original: Map<String, Value>,
}

impl DeploymentNotification {
    /// 엔벨로프의 페이로드를 디코딩합니다.
    ///
    /// 이벤트 타입은 검사하지 않습니다. 호출자가 먼저 확인해야 합니다.
    pub fn decode(event: &CloudEvent) -> Result<Self, IngressError> {
        let original = match &event.data {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(IngressError::PayloadDecode(format!(
                    "expected a JSON object, got {}",
                    json_kind(other)
                )));
            }
            None => return Err(IngressError::PayloadDecode("missing data".to_owned())),
        };

        let data: DeploymentFinishedData =
            serde_json::from_value(Value::Object(original.clone()))
                .map_err(|e| IngressError::PayloadDecode(e.to_string()))?;

        Ok(Self {
            event_id: event.id.clone(),
            correlation_id: event.keptn_context().to_owned(),
            data,
            original,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// tests-finished 페이로드: 원본 + `startedat`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestsFinishedData {
    /// 원본 페이로드 필드
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    /// 테스트 단계 시작 시각
    pub startedat: DateTime<Utc>,
}

impl TestsFinishedData {
    /// 원본 페이로드에 시작 시각을 더한 새 값을 만듭니다.
    pub fn new(original: &Map<String, Value>, started_at: DateTime<Utc>) -> Self {
        let mut payload = original.clone();
        // flatten 시 키 중복을 막기 위해 기존 값은 덮어씀
        payload.remove(FIELD_STARTED_AT);
        Self {
            payload,
            startedat: started_at,
        }
    }
}

/// evaluation-done 페이로드: 원본 + `evaluationpassed`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationDoneData {
    /// 원본 페이로드 필드
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    /// 평가 통과 여부 (발행 시 항상 false)
    pub evaluationpassed: bool,
}

impl EvaluationDoneData {
    /// 원본 페이로드에 `evaluationpassed=false`를 더한 새 값을 만듭니다.
    pub fn failed(original: &Map<String, Value>) -> Self {
        let mut payload = original.clone();
        payload.remove(FIELD_EVALUATION_PASSED);
        Self {
            payload,
            evaluationpassed: false,
        }
    }
}

/// 발신 알림 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// 테스트 통과
    TestsFinished,
    /// 평가 실패
    EvaluationDone,
}

impl NotificationKind {
    /// 선언 이벤트 타입
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TestsFinished => EVENT_TYPE_TESTS_FINISHED,
            Self::EvaluationDone => EVENT_TYPE_EVALUATION_DONE,
        }
    }

    /// 메트릭 레이블용 고정 이름
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::TestsFinished => "tests_finished",
            Self::EvaluationDone => "evaluation_done",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_type())
    }
}

/// 발신 알림
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingNotification {
    /// 테스트 통과
    TestsFinished(TestsFinishedData),
    /// 헬스 체크 또는 테스트 실패
    EvaluationDone(EvaluationDoneData),
}

impl OutgoingNotification {
    /// 알림 종류
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::TestsFinished(_) => NotificationKind::TestsFinished,
            Self::EvaluationDone(_) => NotificationKind::EvaluationDone,
        }
    }

    /// 상관관계 ID를 붙여 발신 엔벨로프로 변환합니다.
    pub fn into_event(
        self,
        source: &str,
        keptn_context: &str,
    ) -> Result<CloudEvent, serde_json::Error> {
        let kind = self.kind();
        let data = match self {
            Self::TestsFinished(data) => serde_json::to_value(data)?,
            Self::EvaluationDone(data) => serde_json::to_value(data)?,
        };
        Ok(CloudEvent::outgoing(
            kind.event_type(),
            source,
            keptn_context,
            data,
        ))
    }
}
