#![cfg(test)]

mod fakes;
mod utils;

mod interface {
    mod detection;
}

mod modal {
    mod ordering;
}

mod pipeline {
    mod failures;
    mod session;
}
