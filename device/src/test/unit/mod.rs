mod context;
mod place;
mod registry;
mod stream;
