//! The builtin module surface (spec.md §9 "builtin module surface"): the
//! concrete primitive types, arithmetic, and `list[T]` specialization
//! needed to run the six seed scenarios end to end. Grounded on
//! `examples/original_source/spy/vm/modules/operator/` for which
//! capability/multimethod entries a minimal numeric tower needs, and on
//! `vm/list.py` for the `list[T]` specialization protocol.

pub mod core;
