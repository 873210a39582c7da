mod annual_summary;
mod month_salary;
mod tax_bracket;
mod tax_record;
mod user;

pub use annual_summary::AnnualSummary;
pub use month_salary::MonthSalary;
pub use tax_bracket::TaxBracket;
pub use tax_record::TaxRecord;
pub use user::{NewUser, User};
