//! # 常用工具模块
//!
//! 目前只有单元测试用到的断言宏
