//! Declaration catalogue wiring.
//!
//! Types here model what a catalogue file declares. `CatalogueBuilder` folds
//! parsed declarations into a `TypeCatalogue`, and `ExternalTypeTable` carries
//! the names a catalogue may reference without declaring them.

pub mod builder;
pub mod external;
pub mod identity;
pub mod index;
pub mod model;

pub use builder::{BuildOutcome, CatalogueBuilder, build_catalogue};
pub use external::ExternalTypeTable;
pub use identity::{MemberKey, MemberKind, TypeKind, TypeName};
pub use index::TypeCatalogue;
pub use model::{
    Block, Callable, Heritage, Literal, Member, MemberBody, Mixin, MixinMode, Overload, Parameter,
    TypeDecl, TypeExpr, TypeParam, Variance,
};
