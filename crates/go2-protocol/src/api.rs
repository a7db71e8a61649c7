//! API ID 常量定义
//!
//! 请求负载中的 `api_id` 字段。按服务（Topic）分组。

/// Sport 服务（`Topic::SportMod`）
pub mod sport {
    /// 阻尼模式（急停：所有电机进入阻尼）
    pub const DAMP: u16 = 1001;
    pub const BALANCE_STAND: u16 = 1002;
    pub const STOP_MOVE: u16 = 1003;
    pub const STAND_UP: u16 = 1004;
    pub const STAND_DOWN: u16 = 1005;
    /// 恢复站立（退出 Pose 模式的唯一途径）
    pub const RECOVERY_STAND: u16 = 1006;
    pub const EULER: u16 = 1007;
    pub const MOVE: u16 = 1008;
    pub const SIT: u16 = 1009;
    pub const BODY_HEIGHT: u16 = 1013;
    pub const SPEED_LEVEL: u16 = 1015;
    /// Pose 模式：摇杆轴改为控制 roll/height/yaw/pitch
    pub const POSE: u16 = 1028;
    /// 灵动模式（AI 模式下带避障的自由行走）
    pub const FREE_WALK: u16 = 1045;
    pub const FREE_BOUND: u16 = 1046;
    pub const FREE_JUMP: u16 = 1047;
    pub const FREE_AVOID: u16 = 1048;
    /// 牵引模式开关，固件复用 FreeWalk 的 ID
    pub const LEAD_FOLLOW: u16 = FREE_WALK;

    /// 低/中/高三档机身高度（米，相对默认站高）
    pub const BODY_HEIGHT_LEVELS: [f64; 3] = [-0.18, 0.0, 0.15];
}

/// 运动模式切换服务（`Topic::MotionSwitcher`）
pub mod motion_switcher {
    /// 查询当前模式，应答 `data.data` 为包含 `name` 的 JSON 字符串
    pub const CHECK_MODE: u16 = 1001;
    /// 切换模式，参数 `{"name": "ai"}`
    pub const SELECT_MODE: u16 = 1002;

    /// 遥操作所需的运动模式
    pub const AI_MODE: &str = "ai";
}

/// 避障服务（`Topic::ObstaclesAvoid`）
pub mod obstacles_avoid {
    pub const SWITCH_SET: u16 = 1001;
    pub const SWITCH_GET: u16 = 1002;
}
