mod documents;
pub mod edit;
pub mod heal;
pub mod init;
pub mod tree;
pub mod validate;

pub use edit::{edit, EditArgs};
pub use heal::{heal, HealArgs};
pub use init::{init, InitArgs};
pub use tree::{tree, TreeArgs};
pub use validate::{validate, ValidateArgs};
