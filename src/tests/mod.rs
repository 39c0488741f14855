mod basic;
mod iter;
mod slice;
mod support;
mod traits;
