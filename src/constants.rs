/// 每天秒数
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// SM-2 易度因子下限
pub const MIN_EASINESS: f64 = 1.3;

/// SM-2 易度因子上限
pub const MAX_EASINESS: f64 = 3.0;

/// 新记录的初始易度因子
pub const INITIAL_EASINESS: f64 = 2.5;

/// 复习间隔下限（天），约 2.4 小时
pub const MIN_INTERVAL_DAYS: f64 = 0.1;

/// 复习间隔上限（天）
pub const MAX_INTERVAL_DAYS: f64 = 365.0;

/// 记忆强度时间因子的归一化窗口（天）
pub const RETENTION_WINDOW_DAYS: f64 = 7.0;

/// 调度器使用的表现分数：答对
pub const PERFORMANCE_CORRECT: f64 = 4.0;

/// 调度器使用的表现分数：答错
pub const PERFORMANCE_INCORRECT: f64 = 1.0;

/// difficulty_progression 环形缓冲区容量
pub const DIFFICULTY_HISTORY_LEN: usize = 10;

/// 未追踪词在低掌握度层中的默认分数
pub const NEW_WORD_MASTERY_SCORE: f64 = 0.5;

/// 学习分析中“最近”的时间窗口（天）
pub const RECENT_ACTIVITY_DAYS: i64 = 7;

/// 用户锁表超过此大小时清理空闲锁
pub const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1000;

/// 键分隔符，不允许出现在 user_id / word 中
pub const KEY_SEPARATOR: char = ':';

/// 单词最大长度（字符）
pub const MAX_WORD_CHARS: usize = 128;

/// 默认事件广播通道容量
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
