mod bracket;
pub use bracket::*;

mod smiles;
pub use smiles::*;

mod writer;
pub use writer::*;
