mod support;

mod e2e_tests;
