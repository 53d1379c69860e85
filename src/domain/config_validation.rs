//! Configuration validation.
//!
//! Validates all config fields before a pipeline run starts.

use crate::domain::error::SigtraderError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_mapper_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_hysteresis(config)?;
    validate_cooldown_bars(config)?;
    validate_exit_band(config)?;
    Ok(())
}

pub fn validate_simulator_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_initial_cash(config)?;
    validate_fee(config)?;
    validate_slippage(config)?;
    Ok(())
}

pub fn validate_walkforward_config(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    validate_block_days(config)?;
    validate_gap_days(config)?;
    validate_dates(config)?;
    Ok(())
}

fn validate_hysteresis(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = config.get_double("mapper", "hysteresis", 0.02);
    if value < 0.0 || !value.is_finite() {
        return Err(SigtraderError::ConfigInvalid {
            section: "mapper".to_string(),
            key: "hysteresis".to_string(),
            reason: "hysteresis must be a non-negative number".to_string(),
        });
    }
    Ok(())
}

fn validate_cooldown_bars(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = config.get_int("mapper", "cooldown_bars", 3);
    if value < 0 {
        return Err(SigtraderError::ConfigInvalid {
            section: "mapper".to_string(),
            key: "cooldown_bars".to_string(),
            reason: "cooldown_bars must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_exit_band(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    match config.get_string("mapper", "exit_band") {
        None => Ok(()),
        Some(s) if matches!(s.as_str(), "full" | "half") => Ok(()),
        Some(_) => Err(SigtraderError::ConfigInvalid {
            section: "mapper".to_string(),
            key: "exit_band".to_string(),
            reason: "exit_band must be 'full' or 'half'".to_string(),
        }),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = config.get_double("simulator", "initial_cash", 1000.0);
    if value <= 0.0 {
        return Err(SigtraderError::ConfigInvalid {
            section: "simulator".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_fee(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = config.get_double("simulator", "fee", 0.1);
    if value < 0.0 {
        return Err(SigtraderError::ConfigInvalid {
            section: "simulator".to_string(),
            key: "fee".to_string(),
            reason: "fee must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = config.get_double("simulator", "slippage_pct", 0.001);
    if value < 0.0 {
        return Err(SigtraderError::ConfigInvalid {
            section: "simulator".to_string(),
            key: "slippage_pct".to_string(),
            reason: "slippage_pct must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_block_days(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = config.get_int("walkforward", "block_days", 30);
    if value < 1 {
        return Err(SigtraderError::ConfigInvalid {
            section: "walkforward".to_string(),
            key: "block_days".to_string(),
            reason: "block_days must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_gap_days(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let value = config.get_int("walkforward", "gap_days", 0);
    if value < 0 {
        return Err(SigtraderError::ConfigInvalid {
            section: "walkforward".to_string(),
            key: "gap_days".to_string(),
            reason: "gap_days must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SigtraderError> {
    let from_str = config.get_string("walkforward", "from");
    let to_str = config.get_string("walkforward", "to");

    let from = parse_date(from_str.as_deref(), "from")?;
    let to = parse_date(to_str.as_deref(), "to")?;

    if from >= to {
        return Err(SigtraderError::ConfigInvalid {
            section: "walkforward".to_string(),
            key: "from".to_string(),
            reason: "from must be before to".to_string(),
        });
    }
    Ok(())
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, SigtraderError> {
    match value {
        None => Err(SigtraderError::ConfigMissing {
            section: "walkforward".to_string(),
            key: field.to_string(),
        }),
        Some(s) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| SigtraderError::ConfigInvalid {
                section: "walkforward".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            })
        }
    }
}
