pub mod arm_hal_ev3;
pub mod brick_ui_ev3;
