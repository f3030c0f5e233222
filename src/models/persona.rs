use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 未指定语气时使用的默认值
pub const DEFAULT_TONE: &str = "neutral";

/// 角色创建模式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersonaMode {
    /// 仅凭角色名由模型自行扮演
    #[default]
    Auto,
    /// 用户提供角色设定摘要
    Custom,
}

impl fmt::Display for PersonaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaMode::Auto => write!(f, "auto"),
            PersonaMode::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for PersonaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(PersonaMode::Auto),
            "custom" => Ok(PersonaMode::Custom),
            other => Err(format!("Unknown persona mode: {}", other)),
        }
    }
}

/// 角色实体
///
/// 用户创建的聊天角色，对话历史按角色归档。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// 角色唯一标识
    pub id: String,

    /// 所属用户
    pub user_id: String,

    /// 角色名
    pub character_name: String,

    /// 创建模式
    pub mode: PersonaMode,

    /// 语气
    pub tone: String,

    /// 角色设定摘要（custom 模式必填）
    pub summary: String,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Persona {
    /// 创建新角色，未提供的语气与摘要取默认值
    pub fn new(
        user_id: &str,
        character_name: &str,
        mode: PersonaMode,
        tone: Option<&str>,
        summary: Option<&str>,
    ) -> Self {
        let tone = tone
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TONE);

        Self {
            id: format!("persona_{}", Uuid::new_v4().simple()),
            user_id: user_id.to_string(),
            character_name: character_name.trim().to_string(),
            mode,
            tone: tone.to_string(),
            summary: summary.map(str::trim).unwrap_or_default().to_string(),
            created_at: Utc::now(),
        }
    }

    /// 生成流水线使用的角色画像
    pub fn profile(&self) -> PersonaProfile {
        let background = if self.summary.is_empty() {
            None
        } else {
            Some(self.summary.clone())
        };
        PersonaProfile {
            character_name: self.character_name.clone(),
            tone: self.tone.clone(),
            background,
        }
    }
}

/// 角色画像
///
/// 一轮对话内不可变，由调用方在构造流水线时提供。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaProfile {
    /// 角色名（非空）
    pub character_name: String,
    /// 语气
    pub tone: String,
    /// 角色设定
    pub background: Option<String>,
}

impl PersonaProfile {
    /// 创建角色画像，空语气回落到 "neutral"
    pub fn new(character_name: impl Into<String>, tone: Option<&str>) -> Self {
        let tone = tone
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TONE);
        Self {
            character_name: character_name.into(),
            tone: tone.to_string(),
            background: None,
        }
    }

    /// 附加角色设定
    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_defaults() {
        let persona = Persona::new("user_1", " Nova ", PersonaMode::Auto, None, None);
        assert_eq!(persona.character_name, "Nova");
        assert_eq!(persona.tone, DEFAULT_TONE);
        assert!(persona.summary.is_empty());
        assert!(persona.id.starts_with("persona_"));
        assert_eq!(persona.profile().background, None);
    }

    #[test]
    fn test_blank_tone_is_neutral() {
        let persona = Persona::new("user_1", "Nova", PersonaMode::Auto, Some("  "), None);
        assert_eq!(persona.tone, "neutral");
    }

    #[test]
    fn test_custom_profile_carries_background() {
        let persona = Persona::new(
            "user_1",
            "Captain Reyes",
            PersonaMode::Custom,
            Some("gruff"),
            Some("A retired starship captain."),
        );
        let profile = persona.profile();
        assert_eq!(profile.tone, "gruff");
        assert_eq!(profile.background.as_deref(), Some("A retired starship captain."));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("CUSTOM".parse::<PersonaMode>(), Ok(PersonaMode::Custom));
        assert_eq!("auto".parse::<PersonaMode>(), Ok(PersonaMode::Auto));
        assert!("manual".parse::<PersonaMode>().is_err());
    }
}
