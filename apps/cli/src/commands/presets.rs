//! presets / actions 命令

use anyhow::Result;
use go2_control::{Preset, RobotAction};

/// 打印全部预设，`current` 为配置文件中的默认预设
pub fn print_presets(current: Preset) -> Result<()> {
    println!(
        "{:<10} {:>8} {:>11} {:>10} {:>10} {:>11} {:>10}",
        "preset", "deadzone", "sensitivity", "linear", "strafe", "rotation", "multiplier"
    );
    for preset in Preset::ALL {
        let s = preset.settings();
        let marker = if preset == current { " *" } else { "" };
        println!(
            "{:<10} {:>8.2} {:>11.2} {:>8.2}m/s {:>8.2}m/s {:>7.2}rad/s {:>10.2}{}",
            preset.as_str(),
            s.deadzone_left,
            s.sensitivity_linear,
            s.max_linear_velocity,
            s.max_strafe_velocity,
            s.max_rotation_velocity,
            s.speed_multiplier,
            marker
        );
    }
    Ok(())
}

/// 打印前端动作名称
pub fn print_actions() -> Result<()> {
    for action in RobotAction::ALL {
        println!("{}", action);
    }
    Ok(())
}
