//! # 着色 Petri 网核心定义（Colored Place/Transition Net）
//!
//! 设库所集合 `P`、变迁集合 `T` 与弧集合 `A ⊆ (P×T) ∪ (T×P)`。每个库所
//! 携带可选的颜色集 `C(p)`（类型元组模式），其 token 集合是保持插入顺序的
//! 多重集。对任意标识 `M`（每个库所当前持有的 token 多重集）：
//!
//! * 变迁 `t ∈ T` **可激发** 当且仅当存在绑定 `β`（对所有输入弧同时一致的
//!   变量赋值），使得：
//!   1. 每条输入弧 `(p, t)` 能在 `M[p]` 中选出 `w(p, t)` 个互不重复、
//!      与弧模式在 `β` 下匹配的 token；
//!   2. 守卫（若存在）在 `β` 下为真；
//! * **发射** 在绑定 `β` 下按身份移除所有选中的输入 token，再对每条输出弧
//!   `(t, p)` 以 `β` 求值其产生式并插入 `w(t, p)` 个新 token。三步对任何
//!   并发发射不可分割（批次内输入库所两两不相交）。
//!
//! 提供的核心 API 支持：
//! * 类型契约（[`ValueType`]）与颜色集匹配；
//! * 库所 token 存储（[`TokenStore`] 与参考实现 [`TokenSet`]）；
//! * 绑定求解、单变迁发射与标识快照；
//! * 访问者双分派遍历（[`NetVisitor`]）与结构校验（[`check_net`]）。
//!
//! ## 示例
//!
//! ```rust
//! use RustCPN::net::{Arc, PetriNet, Place, Token, Transition};
//!
//! let mut net = PetriNet::new();
//! let p0 = net.add_place(Place::new("p0", None));
//! let p1 = net.add_place(Place::new("p1", None));
//! let t0 = net.add_transition(Transition::new("t0"));
//! net.add_arc(Arc::input(p0, t0, 1));
//! net.add_arc(Arc::output(t0, p1, 1));
//!
//! net.get_place(p0).unwrap().add_token(Token::plain());
//! assert_eq!(net.enabled_transitions(), vec![t0]);
//! net.fire(t0).unwrap();
//! assert_eq!(net.get_place(p1).unwrap().token_count(), 1);
//! ```

pub mod arena;
pub mod binding;
pub mod color;
pub mod core;
pub mod ids;
pub mod structure;
pub mod token;
pub mod validate;
pub mod visit;

pub use arena::{Arena, Key};
pub use binding::{Binding, FiringPlan};
pub use color::{Color, ColorSet, ColorValue, PrimitiveType, TypeSlot, ValueType};
pub use core::{FireError, Marking, PetriNet};
pub use ids::{ArcId, PlaceId, TokenId, TransitionId};
pub use structure::{
    Arc, ArcDirection, GuardFn, Inscription, Pattern, Place, Term, Transition, Weight,
};
pub use token::{Token, TokenSet, TokenStore};
pub use validate::{check_net, ValidationReport, Violation};
pub use visit::NetVisitor;
