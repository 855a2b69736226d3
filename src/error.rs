use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("no catalog given; pass --catalog or set `catalog` in the configuration")]
    NoCatalog,
    #[display("unable to load catalog")]
    Catalog,
    #[display("no catalog item with id {_0:?}")]
    UnknownItem(#[error(not(source))] String),
    #[display("storage error")]
    Storage,
    #[display("prefetch error")]
    Prefetch,
    #[display("unable to write output")]
    Output,
}
