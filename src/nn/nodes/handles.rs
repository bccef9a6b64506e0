/*
 * @Author       : 老董
 * @Date         : 2026-02-05
 * @Description  : 带类型的控制句柄。构建路由节点/占位节点时由图直接返回，
 *                 驱动循环用它修改控制状态，无需在运行时判断节点的具体类型。
 */

use super::NodeId;
use crate::nn::OutputRef;

macro_rules! typed_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            id: NodeId,
        }

        impl $name {
            pub(crate) const fn new(id: NodeId) -> Self {
                Self { id }
            }

            pub const fn id(&self) -> NodeId {
                self.id
            }

            /// 节点的第0个输出，可直接作为后续构建调用的输入
            pub const fn output(&self) -> OutputRef {
                OutputRef::new(self.id, 0)
            }
        }

        impl From<$name> for OutputRef {
            fn from(handle: $name) -> Self {
                handle.output()
            }
        }
    };
}

typed_handle!(
    /// 复用器句柄：`Session::select_input`
    MultiplexerHandle
);
typed_handle!(
    /// 开关句柄：`Session::set_enabled`
    SwitchHandle
);
typed_handle!(
    /// 占位节点句柄：`Session::write_values`
    PlaceholderHandle
);
