pub mod bs_analytic;
pub mod jump_adjusted;
