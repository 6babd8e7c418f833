//! 配置管理器 - 负责处理不同环境下的配置覆盖
//!
//! 环境配置位于 `{config_root}/environments/{environment}.toml`，
//! 在所有片段合并之后最后叠加。

use std::env;
use std::path::Path;

use anyhow::Result;
use toml::Table;

use super::{merge_table, read_fragment};

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取当前环境名称
    ///
    /// 从环境变量 SPLIT_NOTIFY_ENV 获取当前环境名称，
    /// 如果未设置则默认为 "development"
    pub fn get_environment() -> String {
        env::var("SPLIT_NOTIFY_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 根据环境加载特定配置
    ///
    /// # 参数
    /// * `merged` - 已合并的配置值，将被修改以包含环境特定配置
    /// * `config_root` - 配置根目录
    /// * `environment` - 环境名称
    pub fn load_environment_config(
        merged: &mut Table,
        config_root: &Path,
        environment: &str,
    ) -> Result<()> {
        let env_config_path = config_root
            .join("environments")
            .join(format!("{environment}.toml"));

        if env_config_path.is_file() {
            merge_table(merged, read_fragment(&env_config_path)?);
        }

        Ok(())
    }
}
