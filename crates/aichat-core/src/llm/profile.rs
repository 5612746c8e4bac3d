//! Model profile table.
//!
//! Four selectors are defined; anything else falls back to selector 0. The
//! deep-reflection toggle only swaps the model name, never the directive.

use aichat_types::llm::ModelProfile;

/// Appended to every directive.
pub const DIRECTIVE_SUFFIX: &str =
    "，全程使用简体中文回答，如果回答中有数学相关公式请使用双$符加换行的markdown语法";

struct ProfileEntry {
    model: &'static str,
    reflection_model: Option<&'static str>,
    directive: &'static str,
    search: bool,
}

static PROFILES: [ProfileEntry; 4] = [
    ProfileEntry {
        model: "deepseek-v3",
        reflection_model: None,
        directive: "你现在是AiChat AI咨询助手，来自AiChat私域聊天平台，是AiChat AI中的一种，请以AiChat AI咨询助手的身份进行回答",
        search: false,
    },
    ProfileEntry {
        model: "qwen-max",
        reflection_model: Some("qwq-plus"),
        directive: "你现在是AiChat AI搜索，来自AiChat私域聊天平台，是AiChat AI中的一种，请以AiChat AI搜索的身份在互联网上搜索相关答案并返回相关内容，如果用户输入了链接那么请拒绝用户的请求并告知用户我无法直接访问网页",
        search: true,
    },
    ProfileEntry {
        model: "deepseek-v3",
        reflection_model: None,
        directive: "你现在是AiChat AI家庭医生助手，来自AiChat私域聊天平台，是AiChat AI中的一种，请以AiChat AI家庭医生的身份进行各种医学知识相关的回答，以中医为主西医为辅",
        search: false,
    },
    ProfileEntry {
        model: "deepseek-v3",
        reflection_model: None,
        directive: "你现在是AiChat AI宠物助手，来自AiChat私域聊天平台，是AiChat AI中的一种，请以AiChat AI宠物助手的身份进行各种宠物知识相关回答",
        search: false,
    },
];

/// Resolves selectors to profiles bound to one chat endpoint.
#[derive(Debug, Clone)]
pub struct ModelProfiles {
    chat_url: String,
}

impl ModelProfiles {
    pub fn new(chat_url: impl Into<String>) -> Self {
        Self {
            chat_url: chat_url.into(),
        }
    }

    /// Look up the profile for `selector`.
    pub fn resolve(&self, selector: u8, deep_reflection: bool) -> ModelProfile {
        let (selector, entry) = match PROFILES.get(selector as usize) {
            Some(entry) => (selector, entry),
            None => (0, &PROFILES[0]),
        };

        let model = match (deep_reflection, entry.reflection_model) {
            (true, Some(reflection)) => reflection,
            _ => entry.model,
        };

        ModelProfile {
            selector,
            endpoint: self.chat_url.clone(),
            model: model.to_string(),
            directive: format!("{}{}", entry.directive, DIRECTIVE_SUFFIX),
            search: entry.search,
        }
    }
}
