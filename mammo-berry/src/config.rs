//! 分类实验的超参数配置.
//!
//! 配置项的名称, 类型和默认值在 [`ExperimentConfig`] 中集中声明一次. 同一份声明同时用于:
//!
//! 1. 命令行解析 ([`ExperimentConfig::parse`]);
//! 2. 以 TOML 格式保存到 `[hyperparams]` 表 ([`ExperimentConfig::save`]);
//! 3. 从保存的文件中重新读取并与默认值合并 ([`ExperimentConfig::load`]).
//!
//! 命令行与文件中的字符串值都会按字段类型转换. 文件中缺少的键保持默认值,
//! 可选字段写作 `"None"` 表示清空, 类型不符时返回 [`ConfigError::TypeMismatch`].

use clap::{Arg, ArgAction, Command};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::Value;

/// 保存配置时使用的表名.
pub const SECTION: &str = "hyperparams";

/// 可选字段为空时在文件中的写法.
pub const NONE_LITERAL: &str = "None";

/// 配置错误.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读写配置文件错误.
    #[error("无法访问 `{path}`: {source}")]
    Io {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// TOML 语法错误.
    #[error("`{path}` 不是合法的 TOML: {source}")]
    Parse {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: toml::de::Error,
    },

    /// TOML 序列化错误.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// 文件中没有 `[hyperparams]` 表.
    #[error("`{0}` 中没有 [hyperparams] 表")]
    MissingSection(PathBuf),

    /// 值的类型与字段不符.
    #[error("配置项 `{key}` 应为 {expected}, 实际为 `{found}`")]
    TypeMismatch {
        /// 配置项名.
        key: String,
        /// 期望的类型.
        expected: &'static str,
        /// 实际的值.
        found: String,
    },

    /// 命令行错误 (包括 `--help`).
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

fn mismatch(key: &str, expected: &'static str, found: impl ToString) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_owned(),
        expected,
        found: found.to_string(),
    }
}

/// 可以作为配置项的类型.
trait ConfigValue: Sized {
    /// 类型名, 用于错误信息.
    const EXPECTED: &'static str;

    /// 命令行上是否为开关 (不带值).
    const IS_FLAG: bool = false;

    /// 从字符串转换.
    fn from_text(key: &str, s: &str) -> Result<Self, ConfigError>;

    /// 从 TOML 值转换. 字符串交给 [`ConfigValue::from_text`].
    fn from_toml(key: &str, v: &Value) -> Result<Self, ConfigError>;

    fn to_toml(&self) -> Value;
}

impl ConfigValue for f64 {
    const EXPECTED: &'static str = "浮点数";

    fn from_text(key: &str, s: &str) -> Result<Self, ConfigError> {
        s.trim().parse().map_err(|_| mismatch(key, Self::EXPECTED, s))
    }

    fn from_toml(key: &str, v: &Value) -> Result<Self, ConfigError> {
        match v {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            Value::String(s) => Self::from_text(key, s),
            other => Err(mismatch(key, Self::EXPECTED, other)),
        }
    }

    fn to_toml(&self) -> Value {
        Value::Float(*self)
    }
}

impl ConfigValue for i64 {
    const EXPECTED: &'static str = "整数";

    fn from_text(key: &str, s: &str) -> Result<Self, ConfigError> {
        s.trim().parse().map_err(|_| mismatch(key, Self::EXPECTED, s))
    }

    fn from_toml(key: &str, v: &Value) -> Result<Self, ConfigError> {
        match v {
            Value::Integer(i) => Ok(*i),
            Value::String(s) => Self::from_text(key, s),
            other => Err(mismatch(key, Self::EXPECTED, other)),
        }
    }

    fn to_toml(&self) -> Value {
        Value::Integer(*self)
    }
}

impl ConfigValue for usize {
    const EXPECTED: &'static str = "非负整数";

    fn from_text(key: &str, s: &str) -> Result<Self, ConfigError> {
        s.trim().parse().map_err(|_| mismatch(key, Self::EXPECTED, s))
    }

    fn from_toml(key: &str, v: &Value) -> Result<Self, ConfigError> {
        match v {
            Value::Integer(i) => usize::try_from(*i).map_err(|_| mismatch(key, Self::EXPECTED, i)),
            Value::String(s) => Self::from_text(key, s),
            other => Err(mismatch(key, Self::EXPECTED, other)),
        }
    }

    fn to_toml(&self) -> Value {
        // 配置中的计数远小于 i64::MAX.
        Value::Integer(*self as i64)
    }
}

impl ConfigValue for bool {
    const EXPECTED: &'static str = "布尔值";
    const IS_FLAG: bool = true;

    fn from_text(key: &str, s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(mismatch(key, Self::EXPECTED, s)),
        }
    }

    fn from_toml(key: &str, v: &Value) -> Result<Self, ConfigError> {
        match v {
            Value::Boolean(b) => Ok(*b),
            Value::String(s) => Self::from_text(key, s),
            other => Err(mismatch(key, Self::EXPECTED, other)),
        }
    }

    fn to_toml(&self) -> Value {
        Value::Boolean(*self)
    }
}

impl ConfigValue for String {
    const EXPECTED: &'static str = "字符串";

    fn from_text(_key: &str, s: &str) -> Result<Self, ConfigError> {
        Ok(s.to_owned())
    }

    fn from_toml(key: &str, v: &Value) -> Result<Self, ConfigError> {
        match v {
            Value::String(s) => Ok(s.clone()),
            other => Err(mismatch(key, Self::EXPECTED, other)),
        }
    }

    fn to_toml(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ConfigValue for Option<String> {
    const EXPECTED: &'static str = "字符串或 None";

    fn from_text(_key: &str, s: &str) -> Result<Self, ConfigError> {
        Ok((s != NONE_LITERAL).then(|| s.to_owned()))
    }

    fn from_toml(key: &str, v: &Value) -> Result<Self, ConfigError> {
        match v {
            Value::String(s) => Self::from_text(key, s),
            other => Err(mismatch(key, Self::EXPECTED, other)),
        }
    }

    fn to_toml(&self) -> Value {
        Value::String(self.as_deref().unwrap_or(NONE_LITERAL).to_owned())
    }
}

/// 声明配置结构体. 每个字段给出类型, 默认值, 长选项名 (第一个为主名, 其余为别名)
/// 和可选的短选项.
macro_rules! config_schema {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[doc = $doc:literal])*
                $field:ident: $ty:ty = $default:expr, [$long:literal $(, $alias:literal)*] $(, $short:literal)?;
            )*
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            $(
                $(#[doc = $doc])*
                pub $field: $ty,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default,)*
                }
            }
        }

        impl $name {
            /// 所有配置项的名称, 按声明顺序.
            pub const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            /// 命令行定义.
            pub fn command() -> Command {
                let mut cmd = Command::new("mammo-berry").about("分类实验超参数");
                $(
                    let mut arg = Arg::new(stringify!($field))
                        .long($long)
                        .help(concat!($($doc),*).trim());
                    $(arg = arg.alias($alias);)*
                    $(arg = arg.short($short);)?
                    arg = if <$ty as ConfigValue>::IS_FLAG {
                        arg.action(ArgAction::SetTrue)
                    } else {
                        arg.action(ArgAction::Set)
                            .value_parser(clap::value_parser!(String))
                            .allow_negative_numbers(true)
                    };
                    cmd = cmd.arg(arg);
                )*
                cmd
            }

            /// 解析命令行 (`args` 的第一项为程序名). 未给出的项取默认值.
            pub fn parse<I, T>(args: I) -> Result<Self, ConfigError>
            where
                I: IntoIterator<Item = T>,
                T: Into<OsString> + Clone,
            {
                let matches = Self::command().try_get_matches_from(args)?;
                let mut ans = Self::default();
                $(
                    let key = stringify!($field);
                    if <$ty as ConfigValue>::IS_FLAG {
                        if matches.get_flag(key) {
                            ans.$field = <$ty as ConfigValue>::from_text(key, "true")?;
                        }
                    } else if let Some(s) = matches.get_one::<String>(key) {
                        ans.$field = <$ty as ConfigValue>::from_text(key, s)?;
                    }
                )*
                Ok(ans)
            }

            /// 将 `table` 中出现的项覆盖到 `self` 上.
            fn merge(&mut self, table: &toml::Table) -> Result<(), ConfigError> {
                for key in table.keys().filter(|k| !Self::FIELDS.contains(&k.as_str())) {
                    log::warn!("忽略未知配置项 `{key}`");
                }
                $(
                    if let Some(v) = table.get(stringify!($field)) {
                        self.$field = <$ty as ConfigValue>::from_toml(stringify!($field), v)?;
                    }
                )*
                Ok(())
            }

            fn to_table(&self) -> toml::Table {
                let mut t = toml::Table::new();
                $(t.insert(stringify!($field).to_owned(), self.$field.to_toml());)*
                t
            }
        }
    };
}

config_schema! {
    /// 分类实验的全部超参数.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ExperimentConfig {
        /// 数据集名.
        dataset: Option<String> = None, ["dataset"], 'd';
        /// 参与训练的数据比例.
        train_rate: f64 = 1.0, ["train_rate", "tr"];
        /// 模型保存路径.
        save_path: Option<String> = None, ["save_path"], 's';
        /// 主干网络, 如 resnet50, densenet.
        model_name: Option<String> = None, ["model_name"], 'm';
        /// 融合方式: concat, coatt, crossatt.
        fusion_type: String = "concat".to_owned(), ["fusion_type", "fuse"];
        /// 批大小.
        batch_size: usize = 32, ["batch_size"], 'b';
        /// 训练轮数.
        epochs: usize = 100, ["epochs"], 'e';
        /// 输入图像边长.
        input_size: usize = 224, ["input_size"], 'i';
        /// 按类别加权.
        weighted_classes: bool = false, ["weighted_classes", "wc"];
        /// 批内样本加权.
        weighted_samples: bool = false, ["weighted_samples", "ws"];
        /// 学习率.
        learning_rate: f64 = 0.01, ["learning_rate", "lr"];
        /// 权重衰减.
        weights_decay: f64 = 0.0, ["weights_decay", "wd"];
        /// 优化器: sgd, adam.
        optimizer: Option<String> = None, ["optimizer", "opt"];
        /// 损失函数: ce, bce.
        criterion: String = "ce".to_owned(), ["criterion", "crt"];
        /// 数据增强实现: torch, albumentations.
        augmentation_type: String = "torch".to_owned(), ["augmentation_type", "aug_type"];
        /// 训练时不使用临床特征的不确定度阈值.
        train_uncertainty: f64 = 0.0, ["train_uncertainty", "train_uct"];
        /// 测试时不使用临床特征的不确定度阈值.
        test_uncertainty: f64 = 0.0, ["test_uncertainty", "test_uct"];
        /// 缺失的临床特征个数.
        missed_feats_num: usize = 0, ["missed_feats_num"];
        /// 缺失特征的填充方式: zeroes 或经验采样.
        missing_feats_fill: String = "zeroes".to_owned(), ["missing_feats_fill"];
        /// 数据加载线程数.
        num_workers: usize = 0, ["num_workers", "njobs"];

        /// 第一阶段学习率.
        first_stage_learning_rate: f64 = 1e-3, ["first_stage_learning_rate", "first_stage_lr"];
        /// 第一阶段权重衰减.
        first_stage_weight_decay: f64 = 0.01, ["first_stage_weight_decay", "first_stage_wd"];
        /// 第一阶段最后一个冻结层.
        first_stage_last_frozen_layer: i64 = 158, ["first_stage_last_frozen_layer", "first_stage_freeze"];
        /// 第二阶段学习率.
        second_stage_learning_rate: f64 = 1e-4, ["second_stage_learning_rate", "second_stage_lr"];
        /// 第二阶段权重衰减.
        second_stage_weight_decay: f64 = 0.01, ["second_stage_weight_decay", "second_stage_wd"];
        /// 第二阶段最后一个冻结层.
        second_stage_last_frozen_layer: i64 = 87, ["second_stage_last_frozen_layer", "second_stage_freeze"];
        /// 第三阶段学习率.
        third_stage_learning_rate: f64 = 1e-5, ["third_stage_learning_rate", "third_stage_lr"];
        /// 第三阶段权重衰减.
        third_stage_weight_decay: f64 = 0.01, ["third_stage_weight_decay", "third_stage_wd"];
        /// 第三阶段最后一个冻结层. -1 表示不冻结.
        third_stage_last_frozen_layer: i64 = -1, ["third_stage_last_frozen_layer", "third_stage_freeze"];
        /// 是否进行第四阶段训练.
        train_with_fourth_stage: bool = false, ["train_with_fourth_stage", "is_fourth_stage"];
        /// 第四阶段学习率.
        fourth_stage_learning_rate: f64 = 1e-6, ["fourth_stage_learning_rate", "fourth_stage_lr"];
        /// 第四阶段权重衰减.
        fourth_stage_weight_decay: f64 = 0.01, ["fourth_stage_weight_decay", "fourth_stage_wd"];
        /// 第四阶段最后一个冻结层.
        fourth_stage_last_frozen_layer: i64 = -1, ["fourth_stage_last_frozen_layer", "fourth_stage_freeze"];

        /// ResNet layer2 使用空洞卷积.
        resnet_dilated_layer2: bool = false, ["resnet_dilated_layer2", "rnet_dil_2nd"];
        /// ResNet layer3 使用空洞卷积.
        resnet_dilated_layer3: bool = false, ["resnet_dilated_layer3", "rnet_dil_3rd"];
        /// ResNet layer4 使用空洞卷积.
        resnet_dilated_layer4: bool = false, ["resnet_dilated_layer4", "rnet_dil_4th"];

        /// 测试时使用预测的临床特征.
        use_predicted_feats: bool = false, ["use_predicted_feats"];
        /// 测试集肿块形状预测结果路径.
        pred_mass_shape: Option<String> = None, ["pred_mass_shape"];
        /// 测试集肿块边缘预测结果路径.
        pred_mass_margins: Option<String> = None, ["pred_mass_margins"];
        /// 测试集肿块图像密度预测结果路径.
        pred_mass_density_image: Option<String> = None, ["pred_mass_density_image"];
        /// 测试集钙化类型预测结果路径.
        pred_calc_type: Option<String> = None, ["pred_calc_type"];
        /// 测试集钙化分布预测结果路径.
        pred_calc_dist: Option<String> = None, ["pred_calc_dist"];
        /// 测试集钙化图像密度预测结果路径.
        pred_calc_density_image: Option<String> = None, ["pred_calc_density_image"];
    }
}

impl ExperimentConfig {
    /// 以 TOML 格式写入 `path` 的 `[hyperparams]` 表. 空的可选字段写作 `"None"`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let mut root = toml::Table::new();
        root.insert(SECTION.to_owned(), Value::Table(self.to_table()));
        let text = toml::to_string(&root)?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })
    }

    /// 读取 `path` 中保存的配置, 覆盖到 `defaults` 上.
    ///
    /// 文件中没有的项保持 `defaults` 中的值; 未知的项记录警告后忽略.
    pub fn load<P: AsRef<Path>>(path: P, defaults: &Self) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let root: toml::Table = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        let Some(Value::Table(table)) = root.get(SECTION) else {
            return Err(ConfigError::MissingSection(path.to_owned()));
        };
        let mut ans = defaults.clone();
        ans.merge(table)?;
        Ok(ans)
    }
}
