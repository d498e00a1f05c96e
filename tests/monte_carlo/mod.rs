mod ensemble;
mod sources;
