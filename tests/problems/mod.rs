use opal::*;

const EPS: f64 = 0.00000001;
const MIP_EPS: f64 = 0.000001;

pub fn assert_optimal(outcome: &SolveOutcome, expected_obj: f64, expected_x: &[f64]) {
    match outcome {
        SolveOutcome::Optimal(sol) => {
            assert!(
                (sol.objective_value() - expected_obj).abs() < MIP_EPS,
                "obj: {}, expected: {}",
                sol.objective_value(),
                expected_obj
            );

            let x = sol.values();

            assert_eq!(x.len(), expected_x.len());

            for (x1, x2) in x.iter().zip(expected_x) {
                assert!((x1 - x2).abs() < MIP_EPS, "x_i: {}, expected: {}", x1, x2);
            }
        }

        _ => panic!("not optimal: {:?}", outcome),
    }
}

pub fn assert_optimal_obj(outcome: &SolveOutcome, expected_obj: f64) {
    match outcome {
        SolveOutcome::Optimal(sol) => {
            assert!(
                (sol.objective_value() - expected_obj).abs() < MIP_EPS,
                "obj: {}, expected: {}",
                sol.objective_value(),
                expected_obj
            );
        }

        _ => panic!("not optimal: {:?}", outcome),
    }
}

pub fn assert_infeasible(outcome: &SolveOutcome) {
    match outcome {
        SolveOutcome::Infeasible => (),
        _ => panic!("not infeasible: {:?}", outcome),
    }
}

pub fn assert_unbounded(outcome: &SolveOutcome) {
    match outcome {
        SolveOutcome::Unbounded => (),
        _ => panic!("not unbounded: {:?}", outcome),
    }
}

pub struct TestProblem {
    pub model: Model,
    pub check: Box<dyn FnOnce(&SolveOutcome)>,
}

impl TestProblem {
    fn new<F: FnOnce(&SolveOutcome) + 'static>(model: Model, check: F) -> Self {
        Self {
            model,
            check: Box::new(check),
        }
    }
}

pub fn empty_model() -> TestProblem {
    let model = Model::new();

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal(outcome, 0., &[])
    })
}

pub fn one_variable_no_constraints() -> TestProblem {
    // min 2x, -1 <= x <= 1
    let mut model = Model::new();
    let x = model.add_var(-1., 1., VarKind::Continuous, "x").unwrap();
    model.set_objective_coefficient(x, 2.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal(outcome, -2., &[-1.])
    })
}

pub fn one_variable_unbounded_below() -> TestProblem {
    // min 2x, x <= 0
    let mut model = Model::new();
    let x = model
        .add_var(f64::NEG_INFINITY, 0., VarKind::Continuous, "x")
        .unwrap();
    model.set_objective_coefficient(x, 2.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| assert_unbounded(outcome))
}

pub fn free_variable_unbounded() -> TestProblem {
    let mut model = Model::new();
    let x = model
        .add_var(f64::NEG_INFINITY, f64::INFINITY, VarKind::Continuous, "x")
        .unwrap();
    model.set_objective_coefficient(x, 2.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| assert_unbounded(outcome))
}

pub fn infeasible_bound_vs_row() -> TestProblem {
    // x <= 0 but a row demands x >= 1
    let mut model = Model::new();
    let x = model
        .add_var(f64::NEG_INFINITY, 0., VarKind::Continuous, "x")
        .unwrap();
    let row = model.add_constraint(1., f64::INFINITY, "floor").unwrap();
    model.set_coefficient(row, x, 1.).unwrap();
    model.set_objective_coefficient(x, 2.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| assert_infeasible(outcome))
}

pub fn empty_row_feasible() -> TestProblem {
    // a coefficient-free row fixed at zero does not cut anything off
    let mut model = Model::new();
    let x = model
        .add_var(3., f64::INFINITY, VarKind::Continuous, "x")
        .unwrap();
    model.add_constraint(0., 0., "noop").unwrap();
    model.set_objective_coefficient(x, 2.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal(outcome, 6., &[3.])
    })
}

pub fn empty_row_infeasible() -> TestProblem {
    let mut model = Model::new();
    let x = model
        .add_var(3., f64::INFINITY, VarKind::Continuous, "x")
        .unwrap();
    model.add_constraint(1., 1., "impossible").unwrap();
    model.set_objective_coefficient(x, 2.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| assert_infeasible(outcome))
}

pub fn linear_system_free_variables() -> TestProblem {
    // 2x + y = 1, 3x + y = 1 has the unique solution (0, 1)
    let inf = f64::INFINITY;
    let mut model = Model::new();
    let x = model.add_var(-inf, inf, VarKind::Continuous, "x").unwrap();
    let y = model.add_var(-inf, inf, VarKind::Continuous, "y").unwrap();

    let r1 = model.add_constraint(1., 1., "r1").unwrap();
    model.set_coefficient(r1, x, 2.).unwrap();
    model.set_coefficient(r1, y, 1.).unwrap();

    let r2 = model.add_constraint(1., 1., "r2").unwrap();
    model.set_coefficient(r2, x, 3.).unwrap();
    model.set_coefficient(r2, y, 1.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal(outcome, 0., &[0., 1.])
    })
}

pub fn production_lp() -> TestProblem {
    // min -5x - 4y s.t. x <= 6, 0.25x + y <= 6, 3x + 2y <= 22
    let inf = f64::INFINITY;
    let mut model = Model::new();
    let x = model.add_var(0., inf, VarKind::Continuous, "x").unwrap();
    let y = model.add_var(0., inf, VarKind::Continuous, "y").unwrap();

    let r1 = model.add_constraint(-inf, 6., "r1").unwrap();
    model.set_coefficient(r1, x, 1.).unwrap();

    let r2 = model.add_constraint(-inf, 6., "r2").unwrap();
    model.set_coefficient(r2, x, 0.25).unwrap();
    model.set_coefficient(r2, y, 1.).unwrap();

    let r3 = model.add_constraint(-inf, 22., "r3").unwrap();
    model.set_coefficient(r3, x, 3.).unwrap();
    model.set_coefficient(r3, y, 2.).unwrap();

    model.set_objective_coefficient(x, -5.).unwrap();
    model.set_objective_coefficient(y, -4.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal(outcome, -40., &[4., 5.])
    })
}

pub fn maximize_two_sided() -> TestProblem {
    // max x + 2y s.t. 3x - 4y >= 10, 2x + 3y <= 18, x, y >= 0
    let inf = f64::INFINITY;
    let mut model = Model::new();
    let x = model.add_var(0., inf, VarKind::Continuous, "x").unwrap();
    let y = model.add_var(0., inf, VarKind::Continuous, "y").unwrap();

    let r1 = model.add_constraint(10., inf, "r1").unwrap();
    model.set_coefficient(r1, x, 3.).unwrap();
    model.set_coefficient(r1, y, -4.).unwrap();

    let r2 = model.add_constraint(-inf, 18., "r2").unwrap();
    model.set_coefficient(r2, x, 2.).unwrap();
    model.set_coefficient(r2, y, 3.).unwrap();

    model.set_objective_coefficient(x, 1.).unwrap();
    model.set_objective_coefficient(y, 2.).unwrap();
    model.set_maximize(true);

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal(outcome, 10., &[6., 2.])
    })
}

pub fn blend_lp() -> TestProblem {
    // max x + 2y s.t. -x + y <= 1, 3x + 2y <= 12, 2x + 3y <= 12, x, y >= 0
    let inf = f64::INFINITY;
    let mut model = Model::new();
    let x = model.add_var(0., inf, VarKind::Continuous, "x").unwrap();
    let y = model.add_var(0., inf, VarKind::Continuous, "y").unwrap();

    let r1 = model.add_constraint(-inf, 1., "r1").unwrap();
    model.set_coefficient(r1, x, -1.).unwrap();
    model.set_coefficient(r1, y, 1.).unwrap();

    let r2 = model.add_constraint(-inf, 12., "r2").unwrap();
    model.set_coefficient(r2, x, 3.).unwrap();
    model.set_coefficient(r2, y, 2.).unwrap();

    let r3 = model.add_constraint(-inf, 12., "r3").unwrap();
    model.set_coefficient(r3, x, 2.).unwrap();
    model.set_coefficient(r3, y, 3.).unwrap();

    model.set_objective_coefficient(x, 1.).unwrap();
    model.set_objective_coefficient(y, 2.).unwrap();
    model.set_maximize(true);

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal(outcome, 7.4, &[1.8, 2.8])
    })
}

pub fn beale_cycle() -> TestProblem {
    // Beale's degenerate example; must terminate at -1
    let inf = f64::INFINITY;
    let mut model = Model::new();

    let obj = [-10., 57., 9., 24.];
    let mut vars = Vec::new();

    for (j, &c) in obj.iter().enumerate() {
        let v = model
            .add_var(0., inf, VarKind::Continuous, format!("x{}", j))
            .unwrap();
        model.set_objective_coefficient(v, c).unwrap();
        vars.push(v);
    }

    let r1 = model.add_constraint(0., inf, "r1").unwrap();
    model.set_coefficient(r1, vars[0], -0.5).unwrap();
    model.set_coefficient(r1, vars[1], 5.5).unwrap();
    model.set_coefficient(r1, vars[2], 2.5).unwrap();
    model.set_coefficient(r1, vars[3], -9.).unwrap();

    let r2 = model.add_constraint(0., inf, "r2").unwrap();
    model.set_coefficient(r2, vars[0], -0.5).unwrap();
    model.set_coefficient(r2, vars[1], 1.5).unwrap();
    model.set_coefficient(r2, vars[2], 0.5).unwrap();
    model.set_coefficient(r2, vars[3], -1.).unwrap();

    let r3 = model.add_constraint(-1., inf, "r3").unwrap();
    model.set_coefficient(r3, vars[0], -1.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal_obj(outcome, -1.)
    })
}

pub fn integrality_tightens_box() -> TestProblem {
    // max x s.t. |x + y| <= 2.5, |x - y| <= 2.5, x integer, both free;
    // the relaxation peaks at 2.5 and integrality drops it to 2
    let mut model = integer_box_model();
    model
        .set_integer(model.var_id(0).unwrap(), true)
        .unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| match outcome {
        SolveOutcome::Optimal(sol) => {
            assert!((sol.objective_value() - 2.).abs() < EPS);
            assert!((sol.values()[0] - 2.).abs() < EPS);
        }
        other => panic!("not optimal: {:?}", other),
    })
}

pub fn mixed_integer_knapsack() -> TestProblem {
    // max x - y + 5z s.t. x + 2y - z <= 19.5, x + y + z >= 3.14,
    // x <= 10, y + z <= 6, x, y >= 0 continuous, z >= 0 integer
    let inf = f64::INFINITY;
    let mut model = Model::new();
    let x = model.add_var(0., inf, VarKind::Continuous, "x").unwrap();
    let y = model.add_var(0., inf, VarKind::Continuous, "y").unwrap();
    let z = model.add_var(0., inf, VarKind::Integer, "z").unwrap();

    let r1 = model.add_constraint(-inf, 19.5, "r1").unwrap();
    model.set_coefficient(r1, x, 1.).unwrap();
    model.set_coefficient(r1, y, 2.).unwrap();
    model.set_coefficient(r1, z, -1.).unwrap();

    let r2 = model.add_constraint(3.14, inf, "r2").unwrap();
    model.set_coefficient(r2, x, 1.).unwrap();
    model.set_coefficient(r2, y, 1.).unwrap();
    model.set_coefficient(r2, z, 1.).unwrap();

    let r3 = model.add_constraint(-inf, 10., "r3").unwrap();
    model.set_coefficient(r3, x, 1.).unwrap();

    let r4 = model.add_constraint(-inf, 6., "r4").unwrap();
    model.set_coefficient(r4, y, 1.).unwrap();
    model.set_coefficient(r4, z, 1.).unwrap();

    model.set_objective_coefficient(x, 1.).unwrap();
    model.set_objective_coefficient(y, -1.).unwrap();
    model.set_objective_coefficient(z, 5.).unwrap();
    model.set_maximize(true);

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal(outcome, 40., &[10., 0., 6.])
    })
}

pub fn infeasible_integer() -> TestProblem {
    // 0.2 <= x <= 0.8 with x integer has no feasible point
    let mut model = Model::new();
    let x = model.add_var(0.2, 0.8, VarKind::Integer, "x").unwrap();
    model.set_objective_coefficient(x, 1.).unwrap();

    TestProblem::new(model, |outcome: &SolveOutcome| assert_infeasible(outcome))
}

pub fn binary_selection() -> TestProblem {
    // max 3a + 2b + 2c s.t. a + b + c <= 2, binaries
    let mut model = Model::new();
    let a = model.add_binary_var("a").unwrap();
    let b = model.add_binary_var("b").unwrap();
    let c = model.add_binary_var("c").unwrap();

    let cap = model.add_constraint(f64::NEG_INFINITY, 2., "cap").unwrap();
    model.set_coefficient(cap, a, 1.).unwrap();
    model.set_coefficient(cap, b, 1.).unwrap();
    model.set_coefficient(cap, c, 1.).unwrap();

    model.set_objective_coefficient(a, 3.).unwrap();
    model.set_objective_coefficient(b, 2.).unwrap();
    model.set_objective_coefficient(c, 2.).unwrap();
    model.set_maximize(true);

    TestProblem::new(model, |outcome: &SolveOutcome| {
        assert_optimal_obj(outcome, 5.)
    })
}

pub fn assignment_feasibility() -> TestProblem {
    // zero-objective feasibility search: place a 3x3 permutation matrix,
    // every row and column holding exactly one distinct position
    let mut model = Model::new();
    let mut cells = Vec::new();

    for i in 0..3 {
        for j in 0..3 {
            cells.push(model.add_binary_var(format!("a{}{}", i, j)).unwrap());
        }
    }

    for i in 0..3 {
        let row = model.add_constraint(1., 1., format!("row{}", i)).unwrap();
        let col = model.add_constraint(1., 1., format!("col{}", i)).unwrap();

        for j in 0..3 {
            model.set_coefficient(row, cells[3 * i + j], 1.).unwrap();
            model.set_coefficient(col, cells[3 * j + i], 1.).unwrap();
        }
    }

    TestProblem::new(model, |outcome: &SolveOutcome| match outcome {
        SolveOutcome::Optimal(sol) => {
            assert!(sol.objective_value().abs() < MIP_EPS);

            let x = sol.values();

            for v in x {
                assert!(
                    v.abs() < MIP_EPS || (v - 1.).abs() < MIP_EPS,
                    "not 0/1: {}",
                    v
                );
            }

            for i in 0..3 {
                let row: f64 = (0..3).map(|j| x[3 * i + j]).sum();
                let col: f64 = (0..3).map(|j| x[3 * j + i]).sum();
                assert!((row - 1.).abs() < MIP_EPS, "row {} sums to {}", i, row);
                assert!((col - 1.).abs() < MIP_EPS, "column {} sums to {}", i, col);
            }
        }

        other => panic!("not optimal: {:?}", other),
    })
}

/// max x over |x + y| <= 2.5, |x - y| <= 2.5 with both variables free.
/// Relaxation optimum 2.5; with x integer, 2.
pub fn integer_box_model() -> Model {
    let inf = f64::INFINITY;
    let mut model = Model::new();
    let x = model.add_var(-inf, inf, VarKind::Continuous, "x").unwrap();
    let y = model.add_var(-inf, inf, VarKind::Continuous, "y").unwrap();

    let r1 = model.add_constraint(-2.5, 2.5, "sum").unwrap();
    model.set_coefficient(r1, x, 1.).unwrap();
    model.set_coefficient(r1, y, 1.).unwrap();

    let r2 = model.add_constraint(-2.5, 2.5, "diff").unwrap();
    model.set_coefficient(r2, x, 1.).unwrap();
    model.set_coefficient(r2, y, -1.).unwrap();

    model.set_objective_coefficient(x, 1.).unwrap();
    model.set_maximize(true);

    model
}

/// max x + y with x in [0, 5], y in [0, 4] and x + y <= 9. Optimum 9;
/// the capacity, objective, and bound mutations in the session tests walk
/// it through 9, 8, 4, and back to 8.
pub fn capacity_model() -> (Model, VarId, VarId, ConId) {
    let mut model = Model::new();
    let x = model.add_var(0., 5., VarKind::Continuous, "x").unwrap();
    let y = model.add_var(0., 4., VarKind::Continuous, "y").unwrap();

    let cap = model.add_constraint(f64::NEG_INFINITY, 9., "cap").unwrap();
    model.set_coefficient(cap, x, 1.).unwrap();
    model.set_coefficient(cap, y, 1.).unwrap();

    model.set_objective_coefficient(x, 1.).unwrap();
    model.set_objective_coefficient(y, 1.).unwrap();
    model.set_maximize(true);

    (model, x, y, cap)
}
