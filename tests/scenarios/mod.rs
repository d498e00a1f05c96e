mod flight;
mod surface;
