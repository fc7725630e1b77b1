//! Context assembly for a chat turn.
//!
//! Builds the ordered message list sent to the provider:
//! `[system] + [trimmed history, oldest first] + [current user message]`.
//! The output always has exactly one system message, first, and the
//! current user message last.

use calmleaf_types::chat::{ChatMode, ConversationTurn};
use calmleaf_types::llm::{Message, MessageRole};

use super::knowledge::KnowledgeBase;

/// System prompt for everyday companion chat.
pub const STANDARD_SYSTEM_PROMPT: &str = "你是一位温暖、耐心的心理陪伴助手。\
倾听用户的情绪，用温和、口语化的中文回应，结合用户的处境给出具体可行的调节建议。\
回答保持简洁，避免空洞的安慰。不进行医学诊断；当用户表现出严重的心理危机时，\
建议尽快寻求线下专业帮助。";

/// System prompt for the structured, counseling-flavored mode.
pub const PROFESSIONAL_SYSTEM_PROMPT: &str = "你是一位具备心理咨询背景的专业助手。\
以认知行为疗法等循证方法为基础，对用户描述的情绪和处境进行结构化分析，\
解释可能的心理机制，并给出分步骤的应对策略。语气专业而不失温度。\
不进行医学诊断，必要时建议线下求助。";

/// Header prefixed to retrieved knowledge when it is appended to the
/// system prompt.
const KNOWLEDGE_HEADER: &str = "相关心理学知识库：";

/// Builds provider message lists from the knowledge base, prompt
/// templates, and a history window.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    knowledge: KnowledgeBase,
}

impl ContextAssembler {
    pub fn new(knowledge: KnowledgeBase) -> Self {
        Self { knowledge }
    }

    /// Assemble the context for one turn.
    ///
    /// `history` is the repository's newest-first window; it is reversed
    /// here so older turns come first. `exclude_id` removes the
    /// just-persisted current turn when the window already contains it.
    pub fn assemble(
        &self,
        mode: ChatMode,
        current_text: &str,
        history: &[ConversationTurn],
        exclude_id: Option<i64>,
    ) -> Vec<Message> {
        let template = match mode {
            ChatMode::Professional => PROFESSIONAL_SYSTEM_PROMPT,
            ChatMode::Standard => STANDARD_SYSTEM_PROMPT,
        };

        let mut system_prompt = template.to_string();
        if let Some(knowledge) = self.knowledge.search(current_text) {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(KNOWLEDGE_HEADER);
            system_prompt.push('\n');
            system_prompt.push_str(&knowledge);
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::new(MessageRole::System, system_prompt));

        for turn in history.iter().rev() {
            if exclude_id == Some(turn.id) {
                continue;
            }
            messages.push(Message::new(turn.role, turn.content.clone()));
        }

        messages.push(Message::new(MessageRole::User, current_text.to_string()));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn assembler() -> ContextAssembler {
        ContextAssembler::new(KnowledgeBase::default())
    }

    fn turn(id: i64, role: MessageRole, content: &str) -> ConversationTurn {
        ConversationTurn {
            id,
            user_id: "u-1".to_string(),
            role,
            content: content.to_string(),
            // Later ids get later timestamps, as the store would assign.
            created_at: Utc::now() + Duration::seconds(id),
        }
    }

    #[test]
    fn test_system_first_user_last_empty_history() {
        let messages = assembler().assemble(ChatMode::Standard, "你好", &[], None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[1].content, "你好");
    }

    #[test]
    fn test_history_reversed_to_oldest_first() {
        // Repository window is newest first.
        let history = vec![
            turn(4, MessageRole::Assistant, "第二次回复"),
            turn(3, MessageRole::User, "第二次提问"),
            turn(2, MessageRole::Assistant, "第一次回复"),
            turn(1, MessageRole::User, "第一次提问"),
        ];
        let messages = assembler().assemble(ChatMode::Standard, "继续", &history, None);
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[1].content, "第一次提问");
        assert_eq!(messages[2].content, "第一次回复");
        assert_eq!(messages[4].content, "第二次回复");
        assert_eq!(messages[5].content, "继续");
    }

    #[test]
    fn test_current_turn_excluded_by_id() {
        let history = vec![
            turn(3, MessageRole::User, "当前消息"),
            turn(2, MessageRole::Assistant, "旧回复"),
            turn(1, MessageRole::User, "旧提问"),
        ];
        let messages = assembler().assemble(ChatMode::Standard, "当前消息", &history, Some(3));
        // system + 2 history + current; id 3 skipped.
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages
                .iter()
                .filter(|m| m.content == "当前消息")
                .count(),
            1
        );
    }

    #[test]
    fn test_mode_selects_template() {
        let standard = assembler().assemble(ChatMode::Standard, "你好", &[], None);
        let professional = assembler().assemble(ChatMode::Professional, "你好", &[], None);
        assert!(standard[0].content.starts_with("你是一位温暖"));
        assert!(professional[0].content.contains("认知行为疗法"));
    }

    #[test]
    fn test_knowledge_appended_after_template() {
        let messages = assembler().assemble(ChatMode::Standard, "我很焦虑", &[], None);
        let system = &messages[0].content;
        assert!(system.starts_with(STANDARD_SYSTEM_PROMPT));
        assert!(system.contains("相关心理学知识库："));
        assert!(system.contains("【焦虑知识】"));
        // Knowledge lands in the system prompt, never as an extra message.
        assert_eq!(
            messages
                .iter()
                .filter(|m| m.role == MessageRole::System)
                .count(),
            1
        );
    }

    #[test]
    fn test_exactly_one_system_message_regardless_of_history() {
        let history = vec![
            turn(2, MessageRole::Assistant, "回复"),
            turn(1, MessageRole::User, "提问"),
        ];
        let messages =
            assembler().assemble(ChatMode::Professional, "压力好大", &history, None);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(
            messages
                .iter()
                .filter(|m| m.role == MessageRole::System)
                .count(),
            1
        );
        assert_eq!(messages.last().unwrap().content, "压力好大");
    }
}
