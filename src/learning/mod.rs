//! 自适应掌握度引擎：间隔重复调度、难度自适应、三层选词与学习尝试记录。
//!
//! 纯计算部分（scheduler / difficulty / recorder / word_selector / prediction /
//! analytics）不做 I/O，显式接收 `now`；`manager` 负责并发控制与持久化。

pub mod analytics;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod manager;
pub mod prediction;
pub mod recorder;
pub mod repository;
pub mod scheduler;
pub mod types;
pub mod word_selector;

pub use config::LearningConfig;
pub use error::{LearningError, PersistenceScope};
pub use manager::{AttemptOutcome, LearningManager, ProfileUpdate};
pub use repository::LearningRepository;
pub use types::{
    DomainEvent, LearningAttempt, LearningDifficulty, LearningProfile, LearningStyle,
    MasteryRecord,
};
