//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (`validator` 派生): 范围、长度
//! - device_id 可作为目录名 (不含路径分隔符与空白)
//! - IMU 通道不重复
//! - 未校准加速度计模式需要 acce 通道
//! - output_dir 非空

use std::collections::HashSet;

use contracts::{CaptureConfig, CaptureError, ImuChannel};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// 校验 CaptureConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &CaptureConfig) -> Result<(), CaptureError> {
    validate_fields(config)?;
    validate_device_id(config)?;
    validate_channels(config)?;
    validate_output_dir(config)?;
    Ok(())
}

/// 派生规则
fn validate_fields(config: &CaptureConfig) -> Result<(), CaptureError> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };
    let (field, message) = first_violation(&errors, "")
        .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
    Err(CaptureError::config_validation(field, message))
}

/// 按字段名排序后取第一个错误，保证报错稳定
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(error) = list.first() {
                    return Some((path, describe(error)));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{index}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

fn describe(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => {
            let mut params: Vec<_> = error
                .params
                .iter()
                .filter(|(name, _)| name.to_string() != "value")
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            params.sort();
            if params.is_empty() {
                format!("failed '{}' check", error.code)
            } else {
                format!("failed '{}' check ({})", error.code, params.join(", "))
            }
        }
    }
}

/// device_id 用作会话目录名后缀
fn validate_device_id(config: &CaptureConfig) -> Result<(), CaptureError> {
    let id = &config.device.device_id;
    if let Some(bad) = id
        .chars()
        .find(|c| matches!(c, '/' | '\\' | ':') || c.is_whitespace() || c.is_control())
    {
        return Err(CaptureError::config_validation(
            "device.device_id",
            format!("device_id '{id}' contains invalid character {bad:?}"),
        ));
    }
    Ok(())
}

/// 通道唯一性与未校准加速度计依赖
fn validate_channels(config: &CaptureConfig) -> Result<(), CaptureError> {
    let mut seen = HashSet::new();
    for channel in &config.imu.channels {
        if !seen.insert(channel) {
            return Err(CaptureError::config_validation(
                format!("imu.channels[{channel}]"),
                "duplicate channel",
            ));
        }
    }

    if config.imu.uncalibrated_accel && !seen.contains(&ImuChannel::Accel) {
        return Err(CaptureError::config_validation(
            "imu.uncalibrated_accel",
            "uncalibrated accelerometer requires the 'acce' channel",
        ));
    }
    Ok(())
}

fn validate_output_dir(config: &CaptureConfig) -> Result<(), CaptureError> {
    if config.session.output_dir.as_os_str().is_empty() {
        return Err(CaptureError::config_validation(
            "session.output_dir",
            "output_dir cannot be empty",
        ));
    }
    Ok(())
}
