//! 着色 Petri 网执行引擎: 类型化 token、访问者遍历与批量发射调度。

pub mod engine;
pub mod net;

pub use engine::{
    run, ConflictPolicy, EngineError, EnginePhase, RunOptions, RunOutcome, RunReport, StopHandle,
};
pub use net::{
    check_net, Arc, ArcDirection, ArcId, Binding, Color, ColorSet, ColorValue, FireError, FiringPlan,
    Inscription, Marking, NetVisitor, Pattern, PetriNet, Place, PlaceId, PrimitiveType, Term,
    Token, TokenId, TokenSet, TokenStore, Transition, TransitionId, ValidationReport, ValueType,
    Violation, Weight,
};
