//! 选词模块：按 复习 → 低掌握度 → 新词 三层优先级组成学习批次

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::NEW_WORD_MASTERY_SCORE;
use crate::learning::config::SelectorConfig;
use crate::learning::types::{DomainEvent, LearningProfile, MasteryRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub words: Vec<String>,
    pub review_count: usize,
    pub low_mastery_count: usize,
    pub new_count: usize,
}

impl Selection {
    pub fn event(&self, user_id: &str) -> DomainEvent {
        DomainEvent::VocabularySelected {
            user_id: user_id.to_string(),
            total_count: self.words.len(),
            review_words: self.review_count,
            low_mastery_words: self.low_mastery_count,
            new_words: self.new_count,
        }
    }
}

fn score_desc(a: &(&str, f64), b: &(&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1)
}

fn score_asc(a: &(&str, f64), b: &(&str, f64)) -> Ordering {
    a.1.total_cmp(&b.1)
}

/// 复习优先级：逾期越久、掌握度/准确率/记忆强度越低，分数越高
pub fn review_priority(record: &MasteryRecord, now: DateTime<Utc>, config: &SelectorConfig) -> f64 {
    let urgency = record.days_overdue(now).max(0.0) * config.overdue_weight;
    let mastery = (1.0 - record.mastery_level) * config.mastery_weight;
    let accuracy = (1.0 - record.accuracy_rate()) * config.accuracy_weight;
    let retention = (1.0 - record.retention_strength) * config.retention_weight;
    urgency + mastery + accuracy + retention
}

struct Batch<'a> {
    words: Vec<&'a str>,
    taken: HashSet<&'a str>,
}

impl<'a> Batch<'a> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity),
            taken: HashSet::with_capacity(capacity),
        }
    }

    fn contains(&self, word: &str) -> bool {
        self.taken.contains(word)
    }

    /// Appends up to `limit` words; returns how many were added.
    fn extend(&mut self, words: impl IntoIterator<Item = &'a str>, limit: usize) -> usize {
        let mut added = 0;
        for word in words {
            if added >= limit {
                break;
            }
            if self.taken.insert(word) {
                self.words.push(word);
                added += 1;
            }
        }
        added
    }
}

/// 从可用词中选出下一批学习词汇。
///
/// 结果长度不超过 `target_count`、不含重复；相同输入（同一 `now`）产生相同输出。
/// 排序使用稳定排序，同分词保持 `available_words` 中的原始顺序。
pub fn select_next_words(
    _profile: &LearningProfile,
    available_words: &[String],
    mastery: &HashMap<String, MasteryRecord>,
    target_count: usize,
    now: DateTime<Utc>,
    config: &SelectorConfig,
) -> Selection {
    if target_count == 0 || available_words.is_empty() {
        return Selection::default();
    }

    let mut seen = HashSet::with_capacity(available_words.len());
    let available: Vec<&str> = available_words
        .iter()
        .map(String::as_str)
        .filter(|word| seen.insert(*word))
        .collect();

    // 输出不会超过去重后的可用词数
    let mut batch = Batch::with_capacity(target_count.min(available.len()));

    // 第一层：到期且未掌握的复习词
    let mut review_candidates: Vec<(&str, f64)> = available
        .iter()
        .filter_map(|word| {
            mastery
                .get(*word)
                .filter(|record| record.needs_review(now) && !record.is_mastered())
                .map(|record| (*word, review_priority(record, now, config)))
        })
        .collect();
    review_candidates.sort_by(score_desc);
    let review_count = batch.extend(
        review_candidates.into_iter().map(|(word, _)| word),
        target_count / 2,
    );

    // 第二层：掌握度升序，新词按默认分数参与排序
    let remaining = target_count - batch.words.len();
    let mut low_mastery_count = 0;
    if remaining > 0 {
        let mut low_candidates: Vec<(&str, f64)> = available
            .iter()
            .filter(|word| !batch.contains(word))
            .filter_map(|word| match mastery.get(*word) {
                Some(record) => match config.low_mastery_ceiling {
                    Some(ceiling) if record.mastery_level >= ceiling => None,
                    _ => Some((*word, record.mastery_level)),
                },
                None => Some((*word, NEW_WORD_MASTERY_SCORE)),
            })
            .collect();
        low_candidates.sort_by(score_asc);
        low_mastery_count = batch.extend(low_candidates.into_iter().map(|(word, _)| word), remaining);
    }

    // 第三层：剩余名额按原始顺序填充未追踪的新词
    let remaining = target_count - batch.words.len();
    let mut new_count = 0;
    if remaining > 0 {
        let fresh: Vec<&str> = available
            .iter()
            .copied()
            .filter(|word| !mastery.contains_key(*word))
            .collect();
        new_count = batch.extend(fresh, remaining);
    }

    let mut words: Vec<String> = batch.words.into_iter().map(str::to_string).collect();
    words.truncate(target_count);

    Selection {
        words,
        review_count,
        low_mastery_count,
        new_count,
    }
}
